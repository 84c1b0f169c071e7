// Credential lifecycle for the Google APIs.
//
// load -> ensure_valid -> (refresh | acquire) -> persist
//
// The token file is the only state this program keeps between runs. Every
// successful refresh or acquisition overwrites it.

use super::credential_models::{
    new_state_token, AuthorizationGrant, AuthorizationRequest, Credential, CredentialError,
    OAuthClient, ServiceAccountKey, ServiceAccountSummary, TokenGrant,
};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};

// ============================================================================
// PORTS
// ============================================================================

/// Where the credential lives between runs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `NotFound` and `Malformed` must be reported as distinct errors.
    async fn load(&self) -> Result<Credential, CredentialError>;

    async fn save(&self, credential: &Credential) -> Result<(), CredentialError>;
}

/// The provider's token endpoint, one method per grant type.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn exchange_code(
        &self,
        client: &OAuthClient,
        grant: &AuthorizationGrant,
    ) -> Result<TokenGrant, CredentialError>;

    async fn refresh(&self, credential: &Credential) -> Result<TokenGrant, CredentialError>;

    async fn service_account_token(
        &self,
        key: &ServiceAccountKey,
        scopes: &[String],
    ) -> Result<TokenGrant, CredentialError>;
}

/// One interchangeable way of getting an authorization code out of a human.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    fn name(&self) -> &'static str;

    async fn authorize(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationGrant, CredentialError>;
}

// ============================================================================
// SERVICE
// ============================================================================

#[derive(Debug, Clone)]
pub struct CredentialSettings {
    pub scopes: Vec<String>,
    pub client_secrets_path: PathBuf,
    /// When set, the unattended service-account path is used instead of the
    /// stored token.
    pub service_account_key: Option<PathBuf>,
}

pub struct CredentialService<S: CredentialStore, T: TokenEndpoint> {
    store: S,
    endpoint: T,
    flow: Box<dyn AuthorizationFlow>,
    settings: CredentialSettings,
}

impl<S: CredentialStore, T: TokenEndpoint> CredentialService<S, T> {
    pub fn new(
        store: S,
        endpoint: T,
        flow: Box<dyn AuthorizationFlow>,
        settings: CredentialSettings,
    ) -> Self {
        Self {
            store,
            endpoint,
            flow,
            settings,
        }
    }

    /// Returns a credential good for every configured scope, acquiring one if
    /// needed.
    pub async fn authorize(&self) -> Result<Credential, CredentialError> {
        if let Some(key_path) = &self.settings.service_account_key {
            return self
                .acquire_service_account(key_path, &self.settings.scopes)
                .await;
        }

        let stored = self.load().await;
        if let Some(credential) = self.ensure_valid(stored).await {
            return Ok(credential);
        }

        self.acquire_interactive(&self.settings.scopes).await
    }

    /// The persisted credential, or `None` if there is nothing usable on disk.
    pub async fn load(&self) -> Option<Credential> {
        match self.store.load().await {
            Ok(credential) => Some(credential),
            Err(CredentialError::NotFound(path)) => {
                tracing::info!("No stored credential at {}", path.display());
                None
            }
            Err(e @ CredentialError::Malformed { .. }) => {
                tracing::warn!("Ignoring stored credential: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Failed to load stored credential: {}", e);
                None
            }
        }
    }

    /// Passes through a usable credential, refreshes an expired one, and
    /// returns `None` when the caller has to acquire a new one.
    pub async fn ensure_valid(&self, credential: Option<Credential>) -> Option<Credential> {
        let credential = credential?;

        if !credential.covers_scopes(&self.settings.scopes) {
            tracing::warn!(
                "Stored credential lacks required scopes (has {:?})",
                credential.scopes
            );
            return None;
        }

        let now = Utc::now();
        if !credential.is_expired_at(now) {
            return Some(credential);
        }

        if credential.refresh_token.is_none() {
            tracing::info!("Stored credential expired and has no refresh token");
            return None;
        }

        tracing::info!("Refreshing expired credential...");
        match self.endpoint.refresh(&credential).await {
            Ok(grant) => {
                let refreshed = credential.refreshed(grant, now);
                self.persist(&refreshed).await;
                tracing::info!("Credential refreshed");
                Some(refreshed)
            }
            Err(e) => {
                tracing::error!("Token refresh failed: {}", e);
                None
            }
        }
    }

    pub async fn acquire_interactive(
        &self,
        scopes: &[String],
    ) -> Result<Credential, CredentialError> {
        let client = OAuthClient::from_file(&self.settings.client_secrets_path).await?;
        let request = AuthorizationRequest {
            client: client.clone(),
            scopes: scopes.to_vec(),
            state: new_state_token(),
        };

        tracing::info!("Starting {} authorization flow", self.flow.name());
        let grant = self.flow.authorize(&request).await?;
        let token = self.endpoint.exchange_code(&client, &grant).await?;

        let credential =
            Credential::from_grant(token, &client.token_uri, Some(&client), scopes, Utc::now());
        if credential.refresh_token.is_none() {
            tracing::warn!("Provider did not issue a refresh token; re-authorization will be needed on expiry");
        }
        self.persist(&credential).await;
        Ok(credential)
    }

    pub async fn acquire_service_account(
        &self,
        key_path: &Path,
        scopes: &[String],
    ) -> Result<Credential, CredentialError> {
        let key = ServiceAccountKey::from_file(key_path).await?;
        tracing::info!("Using service account credentials for {}", key.client_email);

        let token = self.endpoint.service_account_token(&key, scopes).await?;
        let credential = Credential::from_grant(token, &key.token_uri, None, scopes, Utc::now());
        self.persist(&credential).await;
        Ok(credential)
    }

    // A credential we failed to write is still good for this run.
    async fn persist(&self, credential: &Credential) {
        if let Err(e) = self.store.save(credential).await {
            tracing::error!("{}", e);
        }
    }
}

/// Loads and validates a service-account key without contacting Google.
pub async fn validate_service_account_key(
    path: &Path,
) -> Result<ServiceAccountSummary, CredentialError> {
    let key = ServiceAccountKey::from_file(path).await?;
    Ok(key.summary())
}
