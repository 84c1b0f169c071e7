// `content-agent auth`: the interactive bootstrap. Reuses or refreshes a
// stored token when it can, otherwise runs the configured flow once and
// writes the token file for later unattended runs.

use anyhow::Context;

use crate::config::GoogleConfig;

pub async fn execute() -> anyhow::Result<()> {
    let google = GoogleConfig::from_env().context("Invalid configuration")?;
    let http = super::http_client(google.request_timeout)?;
    let credentials = super::credential_service(&google, http);

    if google.service_account_key.is_some() {
        tracing::info!("GOOGLE_APPLICATION_CREDENTIALS is set; verifying service account access");
    } else if !tokio::fs::try_exists(&google.client_secrets)
        .await
        .unwrap_or(false)
    {
        // Checked up front so the user doesn't sit through the flow first.
        tracing::error!(
            "OAuth client secrets not found at {}",
            google.client_secrets.display()
        );
        tracing::error!("Download them from Google Cloud Console (APIs & Services > Credentials)");
    }

    let credential = credentials
        .authorize()
        .await
        .context("Google authorization failed")?;

    match credential.expiry {
        Some(expiry) => tracing::info!("Credential valid until {}", expiry.to_rfc3339()),
        None => tracing::info!("Credential has no recorded expiry"),
    }
    tracing::info!(
        "Authorization complete; token stored at {}",
        google.token_file.display()
    );
    Ok(())
}
