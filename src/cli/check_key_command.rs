use std::path::PathBuf;

use anyhow::{anyhow, Context};

use crate::core::credentials::validate_service_account_key;

/// Validates a service-account key file offline and prints who it belongs to.
pub async fn execute(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path
        .or_else(|| std::env::var_os("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from))
        .ok_or_else(|| {
            anyhow!("no key file given and GOOGLE_APPLICATION_CREDENTIALS is not set")
        })?;

    let summary = validate_service_account_key(&path)
        .await
        .with_context(|| format!("Service account key {} is not usable", path.display()))?;

    println!("Service account key is valid");
    println!("  Client email: {}", summary.client_email);
    println!("  Project ID:   {}", summary.project_id);
    println!();
    println!("Share the target Drive folder with {} (Editor)", summary.client_email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn incomplete_key_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"type":"service_account","project_id":"p"}}"#).unwrap();

        let err = execute(Some(file.path().to_path_buf())).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("not usable"));
        assert!(message.contains("private_key"));
    }

    #[tokio::test]
    async fn missing_key_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(Some(dir.path().join("absent.json")))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("absent.json"));
    }
}
