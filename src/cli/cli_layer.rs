// CLI layer - one module per command. main.rs parses argv into a `Command`
// and hands the result of the matching `execute` to the exit-code mapping.

#[path = "auth_command.rs"]
pub mod auth;

#[path = "check_key_command.rs"]
pub mod check_key;

#[path = "run_command.rs"]
pub mod run;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;

use crate::config::GoogleConfig;
use crate::core::credentials::{CredentialService, CredentialSettings};
use crate::infra::google::{flow_for, GoogleOAuthClient, JsonCredentialStore};

pub const USAGE: &str = "usage: content-agent [run | auth | check-key [path]]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate and publish one document.
    Run,
    /// Obtain or refresh the stored Google token.
    Auth,
    /// Validate a service-account key file.
    CheckKey(Option<PathBuf>),
}

impl Command {
    /// Parses everything after the program name. No command means `run`.
    pub fn from_args<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let command = match args.next().as_deref() {
            None | Some("run") => Command::Run,
            Some("auth") => Command::Auth,
            Some("check-key") => Command::CheckKey(args.next().map(PathBuf::from)),
            Some(other) => return Err(format!("unknown command '{}'\n{}", other, USAGE)),
        };

        if let Some(extra) = args.next() {
            return Err(format!("unexpected argument '{}'\n{}", extra, USAGE));
        }
        Ok(command)
    }
}

/// Every outbound call shares one client so no request can hang forever.
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

pub type GoogleCredentials = CredentialService<JsonCredentialStore, GoogleOAuthClient>;

/// Wires the token file, the token endpoint and the configured flow together.
pub fn credential_service(google: &GoogleConfig, http: Client) -> GoogleCredentials {
    CredentialService::new(
        JsonCredentialStore::new(&google.token_file),
        GoogleOAuthClient::new(http),
        flow_for(google.auth_flow, google.auth_port),
        CredentialSettings {
            scopes: google.scopes.clone(),
            client_secrets_path: google.client_secrets.clone(),
            service_account_key: google.service_account_key.clone(),
        },
    )
}
