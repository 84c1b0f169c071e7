use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::credentials::{Credential, CredentialError, CredentialStore};

/// The token file: one JSON document, overwritten on every save.
pub struct JsonCredentialStore {
    path: PathBuf,
}

impl JsonCredentialStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CredentialStore for JsonCredentialStore {
    async fn load(&self) -> Result<Credential, CredentialError> {
        let text = match fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::NotFound(self.path.clone()))
            }
            Err(e) => {
                return Err(CredentialError::Malformed {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_str(&text).map_err(|e| CredentialError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    async fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| CredentialError::Persist(e.to_string()))?;
            }
        }

        let text = serde_json::to_string_pretty(credential)
            .map_err(|e| CredentialError::Persist(e.to_string()))?;

        // The file holds a live bearer token and a refresh token, so it is
        // private before any of it is written.
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options
            .open(&self.path)
            .await
            .map_err(|e| CredentialError::Persist(e.to_string()))?;

        // `mode` only applies to new files; tighten one left by an older run.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| CredentialError::Persist(e.to_string()))?;
        }

        file.write_all(text.as_bytes())
            .await
            .map_err(|e| CredentialError::Persist(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| CredentialError::Persist(e.to_string()))?;

        tracing::info!("Saved credential to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::credentials::REQUIRED_SCOPES;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn credential() -> Credential {
        Credential {
            access_token: "ya29.token".into(),
            refresh_token: Some("1//refresh".into()),
            token_uri: "https://oauth2.googleapis.com/token".into(),
            client_id: Some("client".into()),
            client_secret: Some("secret".into()),
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
            expiry: Some(Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn saved_credential_loads_back() {
        let dir = tempdir().unwrap();
        let store = JsonCredentialStore::new(dir.path().join("nested").join("token.json"));

        store.save(&credential()).await.unwrap();
        let loaded = JsonCredentialStore::new(store.path()).load().await.unwrap();

        assert_eq!(loaded, credential());
    }

    #[tokio::test]
    async fn save_overwrites_previous_token() {
        let dir = tempdir().unwrap();
        let store = JsonCredentialStore::new(dir.path().join("token.json"));

        store.save(&credential()).await.unwrap();
        let mut newer = credential();
        newer.access_token = "ya29.newer".into();
        store.save(&newer).await.unwrap();

        assert_eq!(store.load().await.unwrap().access_token, "ya29.newer");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = JsonCredentialStore::new(dir.path().join("token.json"));
        assert!(matches!(store.load().await, Err(CredentialError::NotFound(_))));
    }

    #[tokio::test]
    async fn garbage_file_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "\u{80}pickle\x04").unwrap();

        let store = JsonCredentialStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(CredentialError::Malformed { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = JsonCredentialStore::new(dir.path().join("token.json"));
        store.save(&credential()).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn existing_world_readable_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let store = JsonCredentialStore::new(&path);
        store.save(&credential()).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().await.unwrap(), credential());
    }
}
