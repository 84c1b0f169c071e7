use crate::core::topics::{TopicError, TopicSource};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Topics read from a text file, one per line. The file is re-read on every
/// call so edits take effect on the next run without a rebuild.
pub struct LineFileTopics {
    path: PathBuf,
}

impl LineFileTopics {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl TopicSource for LineFileTopics {
    async fn candidates(&self) -> Result<Vec<String>, TopicError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TopicError::FileNotFound(self.path.clone()))
            }
            Err(e) => {
                return Err(TopicError::Read {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        Ok(text.lines().map(str::to_string).collect())
    }
}
