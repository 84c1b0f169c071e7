// The one-shot batch job: topic -> content -> document -> folder.
//
// Nothing escapes `run`. Every outcome, good or bad, comes back as a
// `RunReport` so a scheduler wrapper can tell a clean run from a document
// left unfiled or a run that died before a document existed.

use crate::core::content::{ContentGenerator, ContentSource, TextGenerator};
use crate::core::publishing::{
    document_title, DocumentApi, DocumentPublisher, DriveApi, MoveOutcome, PublishError,
};
use crate::core::topics::{TopicService, TopicSource};
use chrono::NaiveDate;
use std::fmt;

/// Step at which a run gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Topic,
    Authorization,
    Creation,
    Insertion,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Topic => "topic selection",
            RunStage::Authorization => "authorization",
            RunStage::Creation => "document creation",
            RunStage::Insertion => "content insertion",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    Completed {
        document_id: String,
        topic: String,
        folder_id: String,
    },
    /// The document exists but was not moved into the target folder.
    Unfiled {
        document_id: String,
        topic: String,
        reason: String,
    },
    Failed {
        stage: RunStage,
        reason: String,
    },
}

impl RunReport {
    pub fn failed(stage: RunStage, reason: impl ToString) -> Self {
        RunReport::Failed {
            stage,
            reason: reason.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunReport::Failed { .. })
    }

    pub fn document_id(&self) -> Option<&str> {
        match self {
            RunReport::Completed { document_id, .. } | RunReport::Unfiled { document_id, .. } => {
                Some(document_id)
            }
            RunReport::Failed { .. } => None,
        }
    }
}

pub struct ContentPipeline<S, G, D, F>
where
    S: TopicSource,
    G: TextGenerator,
    D: DocumentApi,
    F: DriveApi,
{
    topics: TopicService<S>,
    generator: ContentGenerator<G>,
    publisher: DocumentPublisher<D, F>,
    folder_id: Option<String>,
}

impl<S, G, D, F> ContentPipeline<S, G, D, F>
where
    S: TopicSource,
    G: TextGenerator,
    D: DocumentApi,
    F: DriveApi,
{
    pub fn new(
        topics: TopicService<S>,
        generator: ContentGenerator<G>,
        publisher: DocumentPublisher<D, F>,
        folder_id: Option<String>,
    ) -> Self {
        Self {
            topics,
            generator,
            publisher,
            folder_id,
        }
    }

    /// Runs the whole pipeline once. `date` goes into the document title.
    pub async fn run(&self, date: NaiveDate) -> RunReport {
        let topic = match self.topics.next_topic().await {
            Ok(topic) => topic,
            Err(e) => {
                tracing::error!("Topic selection failed: {}", e);
                return RunReport::failed(RunStage::Topic, e);
            }
        };

        let content = self.generator.generate(&topic).await;
        match &content.source {
            ContentSource::Model(model) => {
                tracing::info!("Generated content for topic: {} (model: {})", topic, model)
            }
            ContentSource::Fallback => {
                tracing::warn!("Using fallback content for topic: {}", topic)
            }
        }

        let title = document_title(date, &topic);
        let document_id = match self.publisher.create(&title, &content.text).await {
            Ok(id) => id,
            Err(e @ PublishError::Insert { .. }) => {
                tracing::error!("Document left without content: {}", e);
                return RunReport::failed(RunStage::Insertion, e);
            }
            Err(e) => {
                tracing::error!("Document creation failed: {}", e);
                return RunReport::failed(RunStage::Creation, e);
            }
        };

        match self
            .publisher
            .move_to_folder(&document_id, self.folder_id.as_deref())
            .await
        {
            MoveOutcome::Moved { folder_id } => RunReport::Completed {
                document_id,
                topic,
                folder_id,
            },
            MoveOutcome::Skipped => RunReport::Unfiled {
                document_id,
                topic,
                reason: "no target folder configured".to_string(),
            },
            MoveOutcome::Failed { reason } => RunReport::Unfiled {
                document_id,
                topic,
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::{GenerationError, GenerationRequest, GenerationSettings};
    use crate::core::publishing::{DocumentId, FileParents};
    use crate::core::topics::StaticTopics;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            Ok(format!("Post about {}\n", request.topic))
        }
    }

    struct DownGenerator;

    #[async_trait]
    impl TextGenerator for DownGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
            Err(GenerationError::Provider {
                model: request.model.clone(),
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingDocs {
        fail_create: bool,
        docs: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl DocumentApi for RecordingDocs {
        async fn create_document(&self, title: &str) -> Result<DocumentId, PublishError> {
            if self.fail_create {
                return Err(PublishError::Api("401 UNAUTHENTICATED".into()));
            }
            self.docs
                .lock()
                .unwrap()
                .push((title.to_string(), String::new()));
            Ok("doc-1".into())
        }

        async fn insert_text(&self, _document_id: &str, text: &str) -> Result<(), PublishError> {
            if let Some(last) = self.docs.lock().unwrap().last_mut() {
                last.1 = text.to_string();
            }
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingDrive {
        fail: bool,
        moves: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl DriveApi for RecordingDrive {
        async fn get_parents(&self, _file_id: &str) -> Result<Vec<String>, PublishError> {
            if self.fail {
                return Err(PublishError::Api("403 insufficientFilePermissions".into()));
            }
            Ok(vec!["root".into()])
        }

        async fn update_parents(
            &self,
            file_id: &str,
            add_parents: &str,
            _remove_parents: &str,
        ) -> Result<FileParents, PublishError> {
            self.moves.lock().unwrap().push(add_parents.to_string());
            Ok(FileParents {
                id: file_id.into(),
                parents: vec![add_parents.into()],
            })
        }
    }

    fn healthy_habits_only() -> TopicService<StaticTopics> {
        TopicService::new(StaticTopics::new(vec!["Healthy Habits".into()]))
    }

    fn quick_settings() -> GenerationSettings {
        GenerationSettings {
            models: vec!["m1".into(), "m2".into()],
            backoff_unit: Duration::ZERO,
            ..GenerationSettings::default()
        }
    }

    fn jan_15() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[tokio::test]
    async fn end_to_end_titles_document_with_date_and_topic() {
        let docs = RecordingDocs::default();
        let drive = RecordingDrive::default();
        let pipeline = ContentPipeline::new(
            healthy_habits_only(),
            ContentGenerator::new(EchoGenerator, quick_settings()),
            DocumentPublisher::new(docs.clone(), drive.clone()),
            Some("folder-42".into()),
        );

        let report = pipeline.run(jan_15()).await;

        assert_eq!(
            report,
            RunReport::Completed {
                document_id: "doc-1".into(),
                topic: "Healthy Habits".into(),
                folder_id: "folder-42".into(),
            }
        );
        let created = docs.docs.lock().unwrap();
        assert_eq!(created[0].0, "2024-01-15 - Healthy Habits");
        assert_eq!(created[0].1, "Post about Healthy Habits");
        assert_eq!(drive.moves.lock().unwrap().as_slice(), &["folder-42".to_string()]);
    }

    #[tokio::test]
    async fn move_failure_leaves_document_unfiled() {
        let drive = RecordingDrive {
            fail: true,
            ..RecordingDrive::default()
        };
        let pipeline = ContentPipeline::new(
            healthy_habits_only(),
            ContentGenerator::new(EchoGenerator, quick_settings()),
            DocumentPublisher::new(RecordingDocs::default(), drive),
            Some("folder-42".into()),
        );

        let report = pipeline.run(jan_15()).await;

        assert!(!report.is_failure());
        assert_eq!(report.document_id(), Some("doc-1"));
        assert!(matches!(report, RunReport::Unfiled { reason, .. } if reason.contains("403")));
    }

    #[tokio::test]
    async fn missing_folder_leaves_document_unfiled() {
        let drive = RecordingDrive::default();
        let pipeline = ContentPipeline::new(
            healthy_habits_only(),
            ContentGenerator::new(EchoGenerator, quick_settings()),
            DocumentPublisher::new(RecordingDocs::default(), drive.clone()),
            None,
        );

        let report = pipeline.run(jan_15()).await;

        assert!(matches!(report, RunReport::Unfiled { .. }));
        assert!(drive.moves.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_topic_list_fails_before_anything_is_created() {
        let docs = RecordingDocs::default();
        let pipeline = ContentPipeline::new(
            TopicService::new(StaticTopics::new(vec![])),
            ContentGenerator::new(EchoGenerator, quick_settings()),
            DocumentPublisher::new(docs.clone(), RecordingDrive::default()),
            None,
        );

        let report = pipeline.run(jan_15()).await;

        assert!(matches!(report, RunReport::Failed { stage: RunStage::Topic, .. }));
        assert!(docs.docs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn creation_failure_is_reported_not_raised() {
        let docs = RecordingDocs {
            fail_create: true,
            ..RecordingDocs::default()
        };
        let pipeline = ContentPipeline::new(
            healthy_habits_only(),
            ContentGenerator::new(EchoGenerator, quick_settings()),
            DocumentPublisher::new(docs, RecordingDrive::default()),
            Some("f".into()),
        );

        let report = pipeline.run(jan_15()).await;

        assert!(report.is_failure());
        assert!(matches!(report, RunReport::Failed { stage: RunStage::Creation, .. }));
    }

    #[tokio::test]
    async fn generator_outage_still_publishes_fallback() {
        let docs = RecordingDocs::default();
        let pipeline = ContentPipeline::new(
            healthy_habits_only(),
            ContentGenerator::new(DownGenerator, quick_settings()),
            DocumentPublisher::new(docs.clone(), RecordingDrive::default()),
            Some("f".into()),
        );

        let report = pipeline.run(jan_15()).await;

        assert!(matches!(report, RunReport::Completed { .. }));
        let body = docs.docs.lock().unwrap()[0].1.clone();
        assert!(body.contains("Healthy Habits"));
    }

    #[test]
    fn stage_names_read_naturally() {
        assert_eq!(RunStage::Insertion.to_string(), "content insertion");
        let report = RunReport::failed(RunStage::Authorization, "token revoked");
        assert_eq!(report.document_id(), None);
    }
}
