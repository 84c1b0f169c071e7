// =============================================================================
// GOOGLE OAUTH2 TOKEN ENDPOINT
// =============================================================================
//
// Three grant types, all POSTed as a form to the token URI:
//
// - authorization_code   after an interactive flow hands us a code
// - refresh_token        when a stored token has expired
// - jwt-bearer           service accounts sign a JWT with their private key
//                        and trade it for an access token (no user involved)

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::credentials::{
    AuthorizationGrant, AuthorizationRequest, Credential, CredentialError, OAuthClient,
    ServiceAccountKey, TokenEndpoint, TokenGrant,
};
use async_trait::async_trait;

/// Lifetime requested for service account assertions (Google's maximum).
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    /// Issuer (service account email).
    iss: String,

    /// Space-separated scopes.
    scope: String,

    /// Audience (token endpoint).
    aud: String,

    /// Issued at (Unix timestamp).
    iat: u64,

    /// Expiration (Unix timestamp, max 1 hour from iat).
    exp: u64,
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl From<TokenResponse> for TokenGrant {
    fn from(response: TokenResponse) -> Self {
        TokenGrant {
            access_token: response.access_token,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
            scope: response.scope,
        }
    }
}

pub struct GoogleOAuthClient {
    client: Client,
}

impl GoogleOAuthClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn post_form(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenGrant, CredentialError> {
        let response = self
            .client
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| CredentialError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = format!("{} - {}", status, text);
            // 4xx means Google looked at the request and said no.
            return Err(if status.is_client_error() {
                CredentialError::Rejected(message)
            } else {
                CredentialError::Transport(message)
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::Transport(e.to_string()))?;
        Ok(token.into())
    }

    fn signed_assertion(
        key: &ServiceAccountKey,
        scopes: &[String],
        now: u64,
    ) -> Result<String, CredentialError> {
        let claims = JwtClaims {
            iss: key.client_email.clone(),
            scope: scopes.join(" "),
            aud: key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(key.private_key_id.clone());
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| CredentialError::MalformedKey(e.to_string()))?;
        encode(&header, &claims, &encoding_key)
            .map_err(|e| CredentialError::MalformedKey(e.to_string()))
    }
}

#[async_trait]
impl TokenEndpoint for GoogleOAuthClient {
    async fn exchange_code(
        &self,
        client: &OAuthClient,
        grant: &AuthorizationGrant,
    ) -> Result<TokenGrant, CredentialError> {
        tracing::info!("Exchanging authorization code for credentials...");
        self.post_form(
            &client.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", &grant.code),
                ("redirect_uri", &grant.redirect_uri),
                ("client_id", &client.client_id),
                ("client_secret", &client.client_secret),
            ],
        )
        .await
    }

    async fn refresh(&self, credential: &Credential) -> Result<TokenGrant, CredentialError> {
        let (Some(refresh_token), Some(client_id)) =
            (&credential.refresh_token, &credential.client_id)
        else {
            return Err(CredentialError::Rejected(
                "stored credential has no refresh token or client id".to_string(),
            ));
        };
        let client_secret = credential.client_secret.as_deref().unwrap_or_default();

        self.post_form(
            &credential.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ],
        )
        .await
    }

    async fn service_account_token(
        &self,
        key: &ServiceAccountKey,
        scopes: &[String],
    ) -> Result<TokenGrant, CredentialError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| CredentialError::Transport(e.to_string()))?
            .as_secs();
        let jwt = Self::signed_assertion(key, scopes, now)?;

        self.post_form(
            &key.token_uri,
            &[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ],
        )
        .await
    }
}

/// Consent screen URL for an interactive flow. Offline access plus a forced
/// consent prompt makes Google issue a refresh token every time.
pub fn authorization_url(
    request: &AuthorizationRequest,
    redirect_uri: &str,
) -> Result<String, CredentialError> {
    let scope = request.scopes.join(" ");
    let url = Url::parse_with_params(
        &request.client.auth_uri,
        &[
            ("response_type", "code"),
            ("client_id", request.client.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", request.state.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("include_granted_scopes", "true"),
        ],
    )
    .map_err(|e| CredentialError::InvalidClientSecrets(format!("bad auth_uri: {}", e)))?;
    Ok(url.to_string())
}
