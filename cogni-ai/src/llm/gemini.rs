//! Google Gemini `generateContent` client

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::time::Duration;

use super::{error_for_status, GenerationRequest, LlmError, LlmProvider, MAX_OUTPUT_TOKENS};

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

pub struct GeminiProvider {
    api_key: String,
    http_client: HttpClient,
    base_url: String,
    model: String,
}

impl GeminiProvider {
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
        let mut parts = vec![json!({ "text": request.prompt })];
        for image in &request.images {
            parts.push(json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(&image.data),
                }
            }));
        }

        let safety_settings: Vec<Value> = SAFETY_CATEGORIES
            .iter()
            .map(|category| json!({ "category": category, "threshold": SAFETY_THRESHOLD }))
            .collect();

        let mut body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "temperature": 0.7,
                "topP": 0.9,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            },
            "safetySettings": safety_settings,
        });

        if let Some(system_prompt) = &request.system_prompt {
            body["systemInstruction"] = json!({ "parts": [{ "text": system_prompt }] });
        }

        body
    }
}

/// Extract the generated text from a `generateContent` response
fn parse_response(response: &Value) -> Result<String, LlmError> {
    let candidate = response["candidates"]
        .as_array()
        .and_then(|candidates| candidates.first());

    let Some(candidate) = candidate else {
        if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
            return Err(LlmError::Blocked(reason.to_string()));
        }
        return Err(LlmError::Provider("Gemini returned no candidates".to_string()));
    };

    let text: String = candidate["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|part| part["text"].as_str()).collect())
        .unwrap_or_default();

    if text.is_empty() {
        if let Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) =
            candidate["finishReason"].as_str()
        {
            return Err(LlmError::Blocked(reason.to_string()));
        }
    }

    Ok(text)
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = self.build_request_body(request);

        tracing::debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            images = request.images.len(),
            "Calling Gemini generateContent"
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_for_status("Gemini", status.as_u16(), &error_text));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Provider(format!("Failed to parse Gemini response: {}", e)))?;

        let text = parse_response(&response_json)?;
        tracing::info!(model = %self.model, output_chars = text.len(), "Gemini generation complete");
        Ok(text)
    }
}
