use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::check_status;
use crate::core::publishing::{DriveApi, FileParents, PublishError};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

#[derive(Debug, Deserialize)]
struct ParentsResponse {
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    id: String,
    #[serde(default)]
    parents: Vec<String>,
}

/// Drive v3 client restricted to the two calls needed to move a file.
pub struct GoogleDriveClient {
    client: Client,
    access_token: String,
}

impl GoogleDriveClient {
    pub fn new(client: Client, access_token: String) -> Self {
        Self {
            client,
            access_token,
        }
    }

    fn file_url(file_id: &str) -> String {
        format!("{}/files/{}", DRIVE_API_BASE, file_id)
    }
}

#[async_trait]
impl DriveApi for GoogleDriveClient {
    async fn get_parents(&self, file_id: &str) -> Result<Vec<String>, PublishError> {
        let response = self
            .client
            .get(Self::file_url(file_id))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "parents")])
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let response = check_status(response, "files.get").await?;
        let body: ParentsResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;
        Ok(body.parents)
    }

    async fn update_parents(
        &self,
        file_id: &str,
        add_parents: &str,
        remove_parents: &str,
    ) -> Result<FileParents, PublishError> {
        let response = self
            .client
            .patch(Self::file_url(file_id))
            .bearer_auth(&self.access_token)
            .query(&[
                ("addParents", add_parents),
                ("removeParents", remove_parents),
                ("fields", "id, parents"),
            ])
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let response = check_status(response, "files.update").await?;
        let body: UpdateResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(FileParents {
            id: body.id,
            parents: body.parents,
        })
    }
}
