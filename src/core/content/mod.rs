pub mod content_models;
pub mod content_service;

pub use content_models::{
    ContentSource, GeneratedContent, GenerationError, GenerationRequest, GenerationSettings,
};
pub use content_service::{ContentGenerator, TextGenerator};
