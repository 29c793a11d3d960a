//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("cogni-ai")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Active text-generation provider ("gemini" or "openai")
    pub provider: String,
    /// Model used for generation
    pub model: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Last failed run, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "cogni-ai".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.pipeline.provider_name().to_string(),
        model: state.pipeline.model().to_string(),
        uptime_seconds,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
