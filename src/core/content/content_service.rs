use super::content_models::{
    ContentSource, GeneratedContent, GenerationError, GenerationRequest, GenerationSettings,
    TOPIC_PLACEHOLDER,
};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends one chat completion request and returns the raw response text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

// Lets callers hand the generator a trait object without fixing the provider type.
#[async_trait]
impl TextGenerator for Box<dyn TextGenerator> {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        (**self).generate(request).await
    }
}

/// Walks the configured model list until one model produces text.
pub struct ContentGenerator<G: TextGenerator> {
    generator: G,
    settings: GenerationSettings,
}

impl<G: TextGenerator> ContentGenerator<G> {
    pub fn new(generator: G, settings: GenerationSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    pub fn render_prompt(&self, topic: &str) -> String {
        self.settings
            .prompt_template
            .replace(TOPIC_PLACEHOLDER, topic)
    }

    /// Never fails: when every model errors out the topic-specific fallback
    /// text is returned instead.
    pub async fn generate(&self, topic: &str) -> GeneratedContent {
        let prompt = self.render_prompt(topic);

        for (index, model) in self.settings.models.iter().enumerate() {
            let attempt = index + 1;
            let delay = backoff_delay(attempt, self.settings.backoff_unit);
            if !delay.is_zero() {
                tracing::info!("Waiting {:?} before trying {}...", delay, model);
                tokio::time::sleep(delay).await;
            }

            tracing::info!("Trying model: {}", model);
            let request = GenerationRequest {
                topic: topic.to_string(),
                prompt: prompt.clone(),
                model: model.clone(),
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            };

            match self.generator.generate(&request).await {
                Ok(text) if !text.trim().is_empty() => {
                    tracing::info!("Content generated successfully using {}", model);
                    return GeneratedContent {
                        text: text.trim().to_string(),
                        source: ContentSource::Model(model.clone()),
                    };
                }
                Ok(_) => {
                    tracing::warn!("Model {} returned empty content", model);
                }
                // Rate limits and hard errors both move on to the next model.
                Err(e) if e.is_rate_limit() => {
                    tracing::info!("Rate limited on {}, trying next model: {}", model, e);
                }
                Err(e) => {
                    tracing::warn!("Failed with model {}: {}", model, e);
                }
            }
        }

        tracing::error!("All models failed, using fallback content");
        GeneratedContent {
            text: fallback_content(topic),
            source: ContentSource::Fallback,
        }
    }
}

/// Delay before the given 1-based attempt: nothing before the first,
/// then 2, 4, 8, ... units.
pub fn backoff_delay(attempt: usize, unit: Duration) -> Duration {
    if attempt <= 1 {
        return Duration::ZERO;
    }
    let exponent = (attempt - 1).min(31) as u32;
    unit.saturating_mul(1u32 << exponent)
}

pub fn fallback_content(topic: &str) -> String {
    format!(
        "আজকে আমরা শিখবো {topic} সম্পর্কে। Today we will learn about {topic}. \
         This is an important topic for English learners. আমাদের এই বিষয়ে আরো জানতে হবে।"
    )
}
