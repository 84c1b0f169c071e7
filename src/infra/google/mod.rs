// =============================================================================
// GOOGLE MODULE
// =============================================================================
//
// Everything that talks to Google lives here:
//
// - `google_oauth_client`   token endpoint (code exchange, refresh, service account JWT)
// - `authorization_flows`   the interactive ways of getting an authorization code
// - `credential_file`       the token file on disk
// - `google_docs_client`    documents.create / documents.batchUpdate
// - `google_drive_client`   files.get / files.update for folder moves
//
// The core layer only sees the traits these implement.

pub mod authorization_flows;
pub mod credential_file;
pub mod google_docs_client;
pub mod google_drive_client;
pub mod google_oauth_client;

pub use authorization_flows::{flow_for, AuthFlowKind};
pub use credential_file::JsonCredentialStore;
pub use google_docs_client::GoogleDocsClient;
pub use google_drive_client::GoogleDriveClient;
pub use google_oauth_client::GoogleOAuthClient;

use crate::core::publishing::PublishError;
use reqwest::Response;

/// Turns a non-2xx response into a `PublishError::Api` carrying the body.
async fn check_status(response: Response, context: &str) -> Result<Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(PublishError::Api(format!(
        "{} failed ({}): {}",
        context, status, text
    )))
}
