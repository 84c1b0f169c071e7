pub mod credential_models;
pub mod credential_service;

pub use credential_models::{
    AuthorizationGrant, AuthorizationRequest, Credential, CredentialError, OAuthClient,
    ServiceAccountKey, TokenGrant, REQUIRED_SCOPES,
};
pub use credential_service::{
    validate_service_account_key, AuthorizationFlow, CredentialService, CredentialSettings,
    CredentialStore, TokenEndpoint,
};
