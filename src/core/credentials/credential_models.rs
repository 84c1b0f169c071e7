use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DOCUMENTS_SCOPE: &str = "https://www.googleapis.com/auth/documents";
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Every call the agent makes is covered by these two scopes.
pub const REQUIRED_SCOPES: &[&str] = &[DOCUMENTS_SCOPE, DRIVE_FILE_SCOPE];

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

pub const SERVICE_ACCOUNT_TYPE: &str = "service_account";
pub const SERVICE_ACCOUNT_REQUIRED_FIELDS: &[&str] = &[
    "type",
    "project_id",
    "private_key_id",
    "private_key",
    "client_email",
    "client_id",
    "auth_uri",
    "token_uri",
];

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_SKEW_SECS: i64 = 60;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Credential file not found: {0}")]
    NotFound(PathBuf),

    #[error("Credential file {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("Failed to persist credential: {0}")]
    Persist(String),

    #[error("OAuth client secrets file not found: {0}")]
    ClientSecretsNotFound(PathBuf),

    #[error("OAuth client secrets are invalid: {0}")]
    InvalidClientSecrets(String),

    #[error("Service account key file not found: {0}")]
    KeyFileNotFound(PathBuf),

    #[error("Service account key is not valid JSON: {0}")]
    MalformedKey(String),

    #[error("Service account key is missing required fields: {}", .0.join(", "))]
    MissingKeyFields(Vec<String>),

    #[error("Invalid service account key type '{0}', expected 'service_account'")]
    WrongKeyType(String),

    #[error("Token endpoint rejected the request: {0}")]
    Rejected(String),

    #[error("Token request failed: {0}")]
    Transport(String),

    #[error("Authorization flow failed: {0}")]
    Flow(String),
}

impl CredentialError {
    /// Misconfiguration that no amount of retrying will fix.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CredentialError::ClientSecretsNotFound(_)
                | CredentialError::InvalidClientSecrets(_)
                | CredentialError::KeyFileNotFound(_)
                | CredentialError::MalformedKey(_)
                | CredentialError::MissingKeyFields(_)
                | CredentialError::WrongKeyType(_)
        )
    }
}

// ============================================================================
// CREDENTIAL
// ============================================================================

/// An OAuth access token plus what is needed to refresh it.
///
/// Serialized in Google's "authorized user" layout so the file is readable by
/// other Google tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl Credential {
    /// Builds a credential from a fresh token response.
    pub fn from_grant(
        grant: TokenGrant,
        token_uri: &str,
        client: Option<&OAuthClient>,
        requested_scopes: &[String],
        now: DateTime<Utc>,
    ) -> Self {
        let scopes = grant
            .granted_scopes()
            .unwrap_or_else(|| requested_scopes.to_vec());
        Self {
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            token_uri: token_uri.to_string(),
            client_id: client.map(|c| c.client_id.clone()),
            client_secret: client.map(|c| c.client_secret.clone()),
            scopes,
            expiry: expiry_after(now, grant.expires_in),
        }
    }

    /// Applies a refresh response. Google usually omits the refresh token on
    /// refresh, in which case the old one is kept.
    pub fn refreshed(mut self, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        if let Some(scopes) = grant.granted_scopes() {
            self.scopes = scopes;
        }
        self.access_token = grant.access_token;
        self.expiry = expiry_after(now, grant.expires_in);
        if grant.refresh_token.is_some() {
            self.refresh_token = grant.refresh_token;
        }
        self
    }

    /// A credential without an expiry never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .map(|expiry| expiry.signed_duration_since(now) <= Duration::seconds(EXPIRY_SKEW_SECS))
            .unwrap_or(false)
    }

    pub fn covers_scopes<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|s| s == scope.as_ref()))
    }
}

/// `None` when the provider sent no lifetime or one too large to represent.
fn expiry_after(now: DateTime<Utc>, expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    let lifetime = Duration::try_seconds(expires_in?)?;
    now.checked_add_signed(lifetime)
}

/// A successful response from the token endpoint.
#[derive(Debug, Clone, Default)]
pub struct TokenGrant {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    /// Space-separated scopes, when the provider reports them.
    pub scope: Option<String>,
}

impl TokenGrant {
    fn granted_scopes(&self) -> Option<Vec<String>> {
        self.scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|scopes| !scopes.is_empty())
    }
}

// ============================================================================
// OAUTH CLIENT SECRETS
// ============================================================================

/// The OAuth client from a Google Cloud Console secrets download.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

/// Desktop clients live under `installed`, web clients under `web`.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<OAuthClient>,
    web: Option<OAuthClient>,
}

impl OAuthClient {
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        let file: ClientSecretsFile = serde_json::from_str(json)
            .map_err(|e| CredentialError::InvalidClientSecrets(e.to_string()))?;
        if file.installed.is_none() && file.web.is_some() {
            tracing::info!("Web application OAuth client detected");
        }
        file.installed.or(file.web).ok_or_else(|| {
            CredentialError::InvalidClientSecrets(
                "expected an 'installed' or 'web' section".to_string(),
            )
        })
    }

    pub async fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::ClientSecretsNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(CredentialError::InvalidClientSecrets(e.to_string())),
        };
        Self::from_json(&json)
    }
}

// ============================================================================
// SERVICE ACCOUNT KEY
// ============================================================================

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    pub private_key_id: String,
    /// PEM-encoded RSA key used to sign the JWT assertion.
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    pub auth_uri: String,
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// What the key validator reports back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccountSummary {
    pub client_email: String,
    pub project_id: String,
}

impl ServiceAccountKey {
    /// Parses and validates a key: every required field must be present and
    /// `type` must be `service_account`.
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| CredentialError::MalformedKey(e.to_string()))?;

        let missing: Vec<String> = SERVICE_ACCOUNT_REQUIRED_FIELDS
            .iter()
            .filter(|field| value.get(**field).is_none())
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(CredentialError::MissingKeyFields(missing));
        }

        match value.get("type").and_then(|t| t.as_str()) {
            Some(SERVICE_ACCOUNT_TYPE) => {}
            other => {
                return Err(CredentialError::WrongKeyType(
                    other.unwrap_or_default().to_string(),
                ))
            }
        }

        serde_json::from_value(value).map_err(|e| CredentialError::MalformedKey(e.to_string()))
    }

    pub async fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::KeyFileNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(CredentialError::MalformedKey(e.to_string())),
        };
        Self::from_json(&json)
    }

    pub fn summary(&self) -> ServiceAccountSummary {
        ServiceAccountSummary {
            client_email: self.client_email.clone(),
            project_id: self.project_id.clone(),
        }
    }
}

// ============================================================================
// AUTHORIZATION CODE FLOW
// ============================================================================

/// Everything a flow needs to send the user to the consent screen.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub client: OAuthClient,
    pub scopes: Vec<String>,
    /// Random value echoed back on the redirect.
    pub state: String,
}

/// The code the user brought back, and the redirect URI it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    pub code: String,
    pub redirect_uri: String,
}

pub fn new_state_token() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
