//! Text-generation provider abstraction
//!
//! Two interchangeable hosted APIs are supported. Both take a single prompt
//! (plus an optional system instruction and inline images) and return plain
//! Markdown text; the pipeline does not care which one produced it.

pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use cogni_common::config::{ProviderKind, ServiceConfig};
use std::sync::Arc;
use thiserror::Error;

/// Upper bound on generated tokens for every request
pub const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Timeout for a single generation call
pub const GENERATION_TIMEOUT_SECS: u64 = 180;

/// Provider errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Content blocked by provider: {0}")]
    Blocked(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// An image passed inline with the prompt
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One generation call
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub system_prompt: Option<String>,
    pub prompt: String,
    pub images: Vec<ImageInput>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_images(mut self, images: Vec<ImageInput>) -> Self {
        self.images = images;
        self
    }
}

/// Hosted text-generation backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name ("gemini" or "openai")
    fn name(&self) -> &str;

    /// Model identifier sent with each request
    fn model(&self) -> &str;

    /// Generate text for a prompt
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

/// Map a non-success HTTP status to an [`LlmError`]
pub(crate) fn error_for_status(provider: &str, status: u16, body: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::Authentication(format!("{} rejected the API key", provider)),
        429 => LlmError::RateLimit,
        _ => {
            // Quota exhaustion is reported as 400/403 by some endpoints
            if body.contains("insufficient_quota") || body.contains("RESOURCE_EXHAUSTED") {
                return LlmError::RateLimit;
            }
            LlmError::Provider(format!("{} HTTP {}: {}", provider, status, truncate_for_log(body)))
        }
    }
}

fn truncate_for_log(body: &str) -> &str {
    const MAX: usize = 500;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Build the provider selected by the configuration
pub fn create_provider(config: &ServiceConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let model_config = config.active_model();
    let api_key = model_config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            LlmError::Config(format!(
                "{} must be set when using {}",
                config.provider.api_key_env(),
                config.provider.display_name()
            ))
        })?;

    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(
            api_key,
            model_config.model.clone(),
            model_config.base_url.clone(),
        )?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
            api_key,
            model_config.model.clone(),
            model_config.base_url.clone(),
        )?),
    };

    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        "LLM provider initialized"
    );
    Ok(provider)
}
