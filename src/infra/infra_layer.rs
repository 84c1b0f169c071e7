// The infra module contains implementations of core traits.
// Each external system gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "topics/line_file_topics.rs"]
pub mod topics;

#[path = "google/mod.rs"]
pub mod google;
