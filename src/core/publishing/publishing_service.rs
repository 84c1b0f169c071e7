// Publishing: turn generated text into a Google Doc and file it in a Drive
// folder. Creation and filing are separate steps on purpose. Once a document
// exists it is never deleted here, whatever happens to the move.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Value some setups leave in `GOOGLE_DRIVE_FOLDER_ID` instead of a real id.
pub const PLACEHOLDER_FOLDER_ID: &str = "your_folder_id_here";

// ============================================================================
// MODELS & ERRORS
// ============================================================================

pub type DocumentId = String;

/// Result of the Drive `files.update` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileParents {
    pub id: String,
    pub parents: Vec<String>,
}

/// What happened when we tried to file the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { folder_id: String },
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to create document: {0}")]
    Create(String),

    /// The document exists but is empty.
    #[error("Document {document_id} was created but inserting content failed: {reason}")]
    Insert {
        document_id: DocumentId,
        reason: String,
    },

    #[error("Google API error: {0}")]
    Api(String),
}

// ============================================================================
// PORTS
// ============================================================================

/// The Google Docs calls the publisher needs.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// `documents.create` with only a title. Returns the new document id.
    async fn create_document(&self, title: &str) -> Result<DocumentId, PublishError>;

    /// `documents.batchUpdate` with one `insertText` at the start of the body.
    async fn insert_text(&self, document_id: &str, text: &str) -> Result<(), PublishError>;
}

/// The Google Drive calls the publisher needs.
#[async_trait]
pub trait DriveApi: Send + Sync {
    async fn get_parents(&self, file_id: &str) -> Result<Vec<String>, PublishError>;

    async fn update_parents(
        &self,
        file_id: &str,
        add_parents: &str,
        remove_parents: &str,
    ) -> Result<FileParents, PublishError>;
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct DocumentPublisher<D: DocumentApi, F: DriveApi> {
    docs: D,
    drive: F,
}

impl<D: DocumentApi, F: DriveApi> DocumentPublisher<D, F> {
    pub fn new(docs: D, drive: F) -> Self {
        Self { docs, drive }
    }

    /// Creates a document and writes `body` into it. Not atomic: if the
    /// insert fails the empty document stays behind and the error carries its id.
    pub async fn create(&self, title: &str, body: &str) -> Result<DocumentId, PublishError> {
        let document_id = self
            .docs
            .create_document(title)
            .await
            .map_err(|e| match e {
                PublishError::Create(reason) | PublishError::Api(reason) => {
                    PublishError::Create(reason)
                }
                other => other,
            })?;
        tracing::info!("Created Google Doc with ID: {}", document_id);

        if let Err(e) = self.docs.insert_text(&document_id, body).await {
            tracing::error!("Content insertion into {} failed: {}", document_id, e);
            return Err(PublishError::Insert {
                document_id,
                reason: e.to_string(),
            });
        }
        tracing::info!("Content inserted into Google Doc");

        Ok(document_id)
    }

    /// Replaces the document's parent folders with `folder_id`. Errors are
    /// logged and reported in the outcome, never returned.
    pub async fn move_to_folder(&self, document_id: &str, folder_id: Option<&str>) -> MoveOutcome {
        let Some(folder_id) = usable_folder_id(folder_id) else {
            tracing::warn!("No valid folder ID provided, document will remain in root");
            return MoveOutcome::Skipped;
        };

        match self.reparent(document_id, folder_id).await {
            Ok(file) => {
                tracing::info!(
                    "Moved document {} to folder {} (parents now: {:?})",
                    file.id,
                    folder_id,
                    file.parents
                );
                MoveOutcome::Moved {
                    folder_id: folder_id.to_string(),
                }
            }
            Err(e) => {
                tracing::error!("Failed to move document {} to folder: {}", document_id, e);
                MoveOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn reparent(&self, document_id: &str, folder_id: &str) -> Result<FileParents, PublishError> {
        let previous = self.drive.get_parents(document_id).await?;
        let remove = remove_parents_param(&previous);
        self.drive
            .update_parents(document_id, folder_id, &remove)
            .await
    }
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn document_title(date: NaiveDate, topic: &str) -> String {
    format!("{} - {}", date.format("%Y-%m-%d"), topic)
}

pub fn document_url(document_id: &str) -> String {
    format!("https://docs.google.com/document/d/{}/edit", document_id)
}

/// Drive expects the folders to drop as one comma-separated string.
pub fn remove_parents_param(parents: &[String]) -> String {
    parents.join(",")
}

/// `None` for an unset, blank or placeholder folder id.
pub fn usable_folder_id(folder_id: Option<&str>) -> Option<&str> {
    folder_id
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != PLACEHOLDER_FOLDER_ID)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDocs {
        fail_create: bool,
        fail_insert: bool,
        inserted: Mutex<Vec<(String, String)>>,
        titles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DocumentApi for FakeDocs {
        async fn create_document(&self, title: &str) -> Result<DocumentId, PublishError> {
            if self.fail_create {
                return Err(PublishError::Api("403 PERMISSION_DENIED".into()));
            }
            self.titles.lock().unwrap().push(title.to_string());
            Ok("doc-123".to_string())
        }

        async fn insert_text(&self, document_id: &str, text: &str) -> Result<(), PublishError> {
            if self.fail_insert {
                return Err(PublishError::Api("500 backend error".into()));
            }
            self.inserted
                .lock()
                .unwrap()
                .push((document_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDrive {
        parents: Vec<String>,
        fail_update: bool,
        updates: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl DriveApi for FakeDrive {
        async fn get_parents(&self, _file_id: &str) -> Result<Vec<String>, PublishError> {
            Ok(self.parents.clone())
        }

        async fn update_parents(
            &self,
            file_id: &str,
            add_parents: &str,
            remove_parents: &str,
        ) -> Result<FileParents, PublishError> {
            self.updates.lock().unwrap().push((
                file_id.to_string(),
                add_parents.to_string(),
                remove_parents.to_string(),
            ));
            if self.fail_update {
                return Err(PublishError::Api("404 File not found".into()));
            }
            Ok(FileParents {
                id: file_id.to_string(),
                parents: vec![add_parents.to_string()],
            })
        }
    }

    fn drive_with_parents(parents: &[&str]) -> FakeDrive {
        FakeDrive {
            parents: parents.iter().map(|p| p.to_string()).collect(),
            ..FakeDrive::default()
        }
    }

    #[test]
    fn title_uses_iso_date_and_topic() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(document_title(date, "Healthy Habits"), "2024-01-15 - Healthy Habits");
    }

    #[test]
    fn remove_parents_joins_with_commas() {
        let parents = vec!["p1".to_string(), "p2".to_string(), "p3".to_string()];
        assert_eq!(remove_parents_param(&parents), "p1,p2,p3");
        assert_eq!(remove_parents_param(&[]), "");
    }

    #[test]
    fn placeholder_and_blank_folders_are_unusable() {
        assert_eq!(usable_folder_id(None), None);
        assert_eq!(usable_folder_id(Some("")), None);
        assert_eq!(usable_folder_id(Some(PLACEHOLDER_FOLDER_ID)), None);
        assert_eq!(usable_folder_id(Some("folder-9")), Some("folder-9"));
    }

    #[tokio::test]
    async fn create_inserts_body_verbatim() {
        let publisher = DocumentPublisher::new(FakeDocs::default(), FakeDrive::default());
        let body = "আজকে আমরা শিখবো Present Simple Tense. It is used for regular actions.";

        let id = publisher.create("2024-01-15 - Tenses", body).await.unwrap();

        assert_eq!(id, "doc-123");
        let inserted = publisher.docs.inserted.lock().unwrap();
        assert_eq!(inserted.as_slice(), &[("doc-123".to_string(), body.to_string())]);
    }

    #[tokio::test]
    async fn failed_creation_inserts_nothing() {
        let docs = FakeDocs {
            fail_create: true,
            ..FakeDocs::default()
        };
        let publisher = DocumentPublisher::new(docs, FakeDrive::default());

        let err = publisher.create("t", "b").await.unwrap_err();

        assert!(matches!(err, PublishError::Create(_)));
        assert!(publisher.docs.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_insert_reports_the_created_document() {
        let docs = FakeDocs {
            fail_insert: true,
            ..FakeDocs::default()
        };
        let publisher = DocumentPublisher::new(docs, FakeDrive::default());

        match publisher.create("t", "b").await {
            Err(PublishError::Insert { document_id, .. }) => assert_eq!(document_id, "doc-123"),
            other => panic!("expected insert error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn move_replaces_all_previous_parents() {
        let publisher =
            DocumentPublisher::new(FakeDocs::default(), drive_with_parents(&["p1", "p2", "p3"]));

        let outcome = publisher.move_to_folder("doc-123", Some("f")).await;

        assert_eq!(outcome, MoveOutcome::Moved { folder_id: "f".into() });
        let updates = publisher.drive.updates.lock().unwrap();
        assert_eq!(
            updates.as_slice(),
            &[("doc-123".to_string(), "f".to_string(), "p1,p2,p3".to_string())]
        );
    }

    #[tokio::test]
    async fn move_without_parents_removes_nothing() {
        let publisher = DocumentPublisher::new(FakeDocs::default(), drive_with_parents(&[]));

        publisher.move_to_folder("doc-123", Some("f")).await;

        let updates = publisher.drive.updates.lock().unwrap();
        assert_eq!(updates[0].2, "");
    }

    #[tokio::test]
    async fn placeholder_folder_skips_the_move() {
        let publisher = DocumentPublisher::new(FakeDocs::default(), drive_with_parents(&["root"]));

        let outcome = publisher
            .move_to_folder("doc-123", Some(PLACEHOLDER_FOLDER_ID))
            .await;

        assert_eq!(outcome, MoveOutcome::Skipped);
        assert!(publisher.drive.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn move_failure_is_reported_not_raised() {
        let drive = FakeDrive {
            parents: vec!["root".into()],
            fail_update: true,
            ..FakeDrive::default()
        };
        let publisher = DocumentPublisher::new(FakeDocs::default(), drive);

        let id = publisher.create("t", "b").await.unwrap();
        let outcome = publisher.move_to_folder(&id, Some("f")).await;

        assert_eq!(id, "doc-123");
        assert!(matches!(outcome, MoveOutcome::Failed { reason } if reason.contains("404")));
    }

    #[test]
    fn document_url_points_at_editor() {
        assert_eq!(
            document_url("abc"),
            "https://docs.google.com/document/d/abc/edit"
        );
    }
}
