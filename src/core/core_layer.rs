// The core module contains all business logic.
// Each pipeline stage gets its own submodule.

#[path = "topics/topic_service.rs"]
pub mod topics;

#[path = "content/mod.rs"]
pub mod content;

#[path = "publishing/publishing_service.rs"]
pub mod publishing;

#[path = "credentials/mod.rs"]
pub mod credentials;

#[path = "pipeline/pipeline_service.rs"]
pub mod pipeline;
