// =============================================================================
// GOOGLE DOCS CLIENT
// =============================================================================
//
// Creating a document with content takes two round trips: `documents.create`
// only accepts a title, so the body goes in afterwards with a
// `documents.batchUpdate` carrying a single `insertText` request.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::check_status;
use crate::core::publishing::{DocumentApi, DocumentId, PublishError};

const DOCS_API_BASE: &str = "https://docs.googleapis.com/v1";

// =============================================================================
// GOOGLE DOCS API REQUEST / RESPONSE STRUCTURES
// =============================================================================

#[derive(Debug, Serialize)]
struct CreateDocumentRequest<'a> {
    title: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    document_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateRequest<'a> {
    requests: Vec<UpdateRequest<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    insert_text: InsertText<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertText<'a> {
    location: Location,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location {
    index: u32,
}

impl<'a> BatchUpdateRequest<'a> {
    /// Index 1 is the start of the body of a fresh document.
    fn insert_at_start(text: &'a str) -> Self {
        Self {
            requests: vec![UpdateRequest {
                insert_text: InsertText {
                    location: Location { index: 1 },
                    text,
                },
            }],
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoogleDocsClient {
    client: Client,
    access_token: String,
}

impl GoogleDocsClient {
    pub fn new(client: Client, access_token: String) -> Self {
        Self {
            client,
            access_token,
        }
    }
}

#[async_trait]
impl DocumentApi for GoogleDocsClient {
    async fn create_document(&self, title: &str) -> Result<DocumentId, PublishError> {
        let response = self
            .client
            .post(format!("{}/documents", DOCS_API_BASE))
            .bearer_auth(&self.access_token)
            .json(&CreateDocumentRequest { title })
            .send()
            .await
            .map_err(|e| PublishError::Create(e.to_string()))?;

        let response = check_status(response, "documents.create").await?;
        let document: Document = response
            .json()
            .await
            .map_err(|e| PublishError::Create(e.to_string()))?;

        tracing::debug!("documents.create returned {}", document.document_id);
        Ok(document.document_id)
    }

    async fn insert_text(&self, document_id: &str, text: &str) -> Result<(), PublishError> {
        let url = format!("{}/documents/{}:batchUpdate", DOCS_API_BASE, document_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&BatchUpdateRequest::insert_at_start(text))
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        check_status(response, "documents.batchUpdate").await?;
        Ok(())
    }
}
