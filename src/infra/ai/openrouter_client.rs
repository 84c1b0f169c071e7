use crate::core::content::{GenerationError, GenerationRequest, TextGenerator};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

// OpenRouter attribution headers.
const REFERER: &str = "https://github.com/ai-content-automation";
const APP_TITLE: &str = "AI Content Automation Agent";

pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
        })
    }

    fn payload(request: &GenerationRequest) -> Value {
        json!({
            "model": request.model,
            "messages": request.messages(),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }

    /// Pulls `choices[0].message.content` out of a response body.
    ///
    /// OpenRouter sometimes answers 200 with an `error` object instead of
    /// choices, usually when the upstream provider is rate limited.
    fn extract_content(body: &Value, model: &str) -> Result<String, GenerationError> {
        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(Value::as_u64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            if code == 429 || message.to_lowercase().contains("rate") {
                return Err(GenerationError::RateLimited {
                    model: model.to_string(),
                    detail: message,
                });
            }
            return Err(GenerationError::Provider {
                model: model.to_string(),
                status: u16::try_from(code).unwrap_or(0),
                body: message,
            });
        }

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GenerationError::MalformedResponse {
                model: model.to_string(),
                reason: "missing choices[0].message.content".to_string(),
            })
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let model = request.model.as_str();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&Self::payload(request))
            .send()
            .await
            .map_err(|e| GenerationError::Transport {
                model: model.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(GenerationError::RateLimited {
                    model: model.to_string(),
                    detail: text,
                });
            }
            return Err(GenerationError::Provider {
                model: model.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        let response_json: Value =
            response
                .json()
                .await
                .map_err(|e| GenerationError::MalformedResponse {
                    model: model.to_string(),
                    reason: e.to_string(),
                })?;

        Self::extract_content(&response_json, model)
    }
}
