// Topic selection. The service only knows that *some* source can hand it a
// list of candidate strings; whether they come from the compiled-in list or a
// text file on disk is decided by the `run` command.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::PathBuf;
use thiserror::Error;

/// A short label naming the subject of a generated document.
pub type Topic = String;

/// Topics used when no topic file is configured.
pub const DEFAULT_TOPICS: &[&str] = &[
    "Healthy Habits",
    "Technology Trends",
    "Personal Development",
    "Environmental Awareness",
    "Digital Marketing",
    "Remote Work Tips",
    "Financial Planning",
    "Mental Health",
    "Productivity Hacks",
    "Social Media Strategy",
];

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("Topic file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read topic file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Topic list is empty")]
    Empty,
}

/// Port for anything that can supply candidate topics.
///
/// Sources return raw entries; trimming and blank filtering happen in
/// [`TopicService`] so every source behaves the same way.
#[async_trait]
pub trait TopicSource: Send + Sync {
    async fn candidates(&self) -> Result<Vec<String>, TopicError>;
}

/// A fixed, in-memory list of topics.
pub struct StaticTopics {
    topics: Vec<String>,
}

impl StaticTopics {
    pub fn new(topics: Vec<String>) -> Self {
        Self { topics }
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect())
    }
}

#[async_trait]
impl TopicSource for StaticTopics {
    async fn candidates(&self) -> Result<Vec<String>, TopicError> {
        Ok(self.topics.clone())
    }
}

#[async_trait]
impl TopicSource for Box<dyn TopicSource> {
    async fn candidates(&self) -> Result<Vec<String>, TopicError> {
        (**self).candidates().await
    }
}

pub struct TopicService<S: TopicSource> {
    source: S,
}

impl<S: TopicSource> TopicService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Picks one topic uniformly at random. No history is kept, so repeats
    /// across runs are expected.
    pub async fn next_topic(&self) -> Result<Topic, TopicError> {
        let candidates = normalize(self.source.candidates().await?);
        let topic = choose(&candidates, &mut rand::thread_rng())?;
        tracing::info!("Selected topic: {}", topic);
        Ok(topic)
    }
}

/// Trims every entry and drops the blank ones.
pub fn normalize(raw: Vec<String>) -> Vec<String> {
    raw.into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn choose<R: Rng + ?Sized>(candidates: &[String], rng: &mut R) -> Result<Topic, TopicError> {
    candidates.choose(rng).cloned().ok_or(TopicError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn topics(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn next_topic_is_always_a_member() {
        let list = topics(&["Present Simple Tense", "Future Plans", "Bangla Food Culture"]);
        let service = TopicService::new(StaticTopics::new(list.clone()));

        for _ in 0..50 {
            let topic = service.next_topic().await.unwrap();
            assert!(list.contains(&topic));
        }
    }

    #[tokio::test]
    async fn empty_list_is_a_configuration_error() {
        let service = TopicService::new(StaticTopics::new(vec![]));
        assert!(matches!(service.next_topic().await, Err(TopicError::Empty)));
    }

    #[tokio::test]
    async fn blank_only_list_is_empty() {
        let service = TopicService::new(StaticTopics::new(topics(&["", "   ", "\t"])));
        assert!(matches!(service.next_topic().await, Err(TopicError::Empty)));
    }

    #[test]
    fn normalize_trims_and_drops_blank_lines() {
        let raw = topics(&["  Mental Health  ", "", "Remote Work Tips\r", "   "]);
        assert_eq!(normalize(raw), topics(&["Mental Health", "Remote Work Tips"]));
    }

    #[test]
    fn choose_reaches_every_candidate() {
        let list = topics(&["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(choose(&list, &mut rng).unwrap());
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn builtin_list_contains_healthy_habits() {
        assert!(DEFAULT_TOPICS.contains(&"Healthy Habits"));
        assert_eq!(DEFAULT_TOPICS.len(), 10);
    }
}
