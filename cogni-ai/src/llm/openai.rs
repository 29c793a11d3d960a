//! OpenAI chat completions client

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::time::Duration;

use super::{error_for_status, GenerationRequest, LlmError, LlmProvider, MAX_OUTPUT_TOKENS};

pub struct OpenAiProvider {
    api_key: String,
    http_client: HttpClient,
    base_url: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Result<Self, LlmError> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(super::GENERATION_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            api_key,
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn build_request_body(&self, request: &GenerationRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system_prompt) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system_prompt }));
        }

        // Plain string content unless images force the multi-part form
        let user_content = if request.images.is_empty() {
            json!(request.prompt)
        } else {
            let mut parts = vec![json!({ "type": "text", "text": request.prompt })];
            for image in &request.images {
                let encoded = base64::engine::general_purpose::STANDARD.encode(&image.data);
                parts.push(json!({
                    "type": "image_url",
                    "image_url": { "url": format!("data:{};base64,{}", image.mime_type, encoded) }
                }));
            }
            Value::Array(parts)
        };
        messages.push(json!({ "role": "user", "content": user_content }));

        json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": MAX_OUTPUT_TOKENS,
        })
    }
}

fn parse_response(response: &Value) -> Result<String, LlmError> {
    let choice = response["choices"]
        .as_array()
        .and_then(|choices| choices.first())
        .ok_or_else(|| LlmError::Provider("OpenAI returned no choices".to_string()))?;

    if choice["finish_reason"].as_str() == Some("content_filter") {
        return Err(LlmError::Blocked("content_filter".to_string()));
    }

    Ok(choice["message"]["content"].as_str().unwrap_or_default().to_string())
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request_body(request);

        tracing::debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            images = request.images.len(),
            "Calling OpenAI chat completions"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_for_status("OpenAI", status.as_u16(), &error_text));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Provider(format!("Failed to parse OpenAI response: {}", e)))?;

        let text = parse_response(&response_json)?;
        tracing::info!(model = %self.model, output_chars = text.len(), "OpenAI generation complete");
        Ok(text)
    }
}
