use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Models tried in order until one answers.
pub const DEFAULT_MODELS: &[&str] = &[
    "google/gemini-2.5-flash-lite-preview-06-17",
    "moonshotai/kimi-k2:free",
    "meta-llama/llama-3.2-3b-instruct:free",
    "microsoft/phi-3-mini-128k-instruct:free",
];

/// Placeholder substituted with the topic when rendering a prompt template.
pub const TOPIC_PLACEHOLDER: &str = "{topic}";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Create an engaging blog post about \"{topic}\" in mixed Bangla-English format.

Requirements:
- Write 800-1000 words
- Use both Bangla and English naturally
- Include practical tips and examples
- Make it engaging and informative
- Add relevant headings and subheadings
- Target audience: Young professionals and students

Topic: {topic}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// One attempt against one model. Built fresh for every attempt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub topic: String,
    pub prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationRequest {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![ChatMessage {
            role: "user".to_string(),
            content: self.prompt.clone(),
        }]
    }
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub models: Vec<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Base of the exponential backoff between model attempts.
    pub backoff_unit: Duration,
    pub prompt_template: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            max_tokens: 2000,
            temperature: 0.7,
            backoff_unit: Duration::from_secs(1),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

/// Where a piece of content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Model(String),
    Fallback,
}

#[derive(Debug, Clone)]
pub struct GeneratedContent {
    pub text: String,
    pub source: ContentSource,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Rate limited on {model}: {detail}")]
    RateLimited { model: String, detail: String },

    #[error("{model} returned HTTP {status}: {body}")]
    Provider {
        model: String,
        status: u16,
        body: String,
    },

    #[error("Request to {model} failed: {reason}")]
    Transport { model: String, reason: String },

    #[error("Unusable response from {model}: {reason}")]
    MalformedResponse { model: String, reason: String },
}

impl GenerationError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GenerationError::RateLimited { .. })
    }
}
