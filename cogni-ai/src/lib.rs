//! cogni-ai library interface
//!
//! Exposes the pipeline, clients and router for the binaries and for
//! integration testing.

pub mod api;
pub mod error;
pub mod llm;
pub mod seed;
pub mod services;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter, Registry};

use crate::services::InsightPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Insight pipeline (datastore + provider)
    pub pipeline: Arc<InsightPipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last failed run, reported by the health endpoint
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(pipeline: Arc<InsightPipeline>) -> Self {
        Self {
            pipeline,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a failure for `/health`
    pub async fn record_error(&self, error: impl Into<String>) {
        *self.last_error.write().await = Some(error.into());
    }
}

/// Level used until configuration has been loaded
pub const STARTUP_LOG_LEVEL: &str = "info";

/// Adjusts the installed log filter once the configured level is known
#[derive(Clone)]
pub struct LogFilterHandle(reload::Handle<EnvFilter, Registry>);

impl LogFilterHandle {
    /// Apply the configured level; `RUST_LOG` still takes precedence
    pub fn set_level(&self, level: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        if let Err(e) = self.0.reload(filter) {
            tracing::warn!("Failed to apply log level '{}': {}", level, e);
        }
    }
}

/// Initialize the tracing subscriber before configuration is read
///
/// Returns `None` when a subscriber is already installed (tests).
pub fn init_tracing() -> Option<LogFilterHandle> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(STARTUP_LOG_LEVEL));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok()?;

    Some(LogFilterHandle(handle))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::insight_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_applied_after_startup() {
        let handle = init_tracing().expect("no subscriber installed yet in this test binary");
        let rust_log = std::env::var_os("RUST_LOG").is_some();

        handle.set_level("debug");
        assert!(tracing::enabled!(tracing::Level::DEBUG) || rust_log);

        handle.set_level("warn");
        assert!(!tracing::enabled!(tracing::Level::INFO) || rust_log);
    }
}
