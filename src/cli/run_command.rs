// `content-agent run`: authorize, then one pass of the pipeline.

use anyhow::Context;
use chrono::Local;

use crate::config::Config;
use crate::core::content::ContentGenerator;
use crate::core::pipeline::{ContentPipeline, RunReport, RunStage};
use crate::core::publishing::{document_url, DocumentPublisher};
use crate::core::topics::{StaticTopics, TopicService, TopicSource};
use crate::infra::ai::OpenRouterClient;
use crate::infra::google::{GoogleDocsClient, GoogleDriveClient};
use crate::infra::topics::LineFileTopics;

/// Errors here are configuration problems found before anything ran. Once the
/// pipeline starts, every outcome is reported through the `RunReport`.
pub async fn execute() -> anyhow::Result<RunReport> {
    let config = Config::from_env().context("Invalid configuration")?;
    tracing::info!("Starting content automation run");

    let http = super::http_client(config.request_timeout)?;

    let credentials = super::credential_service(&config.google, http.clone());
    let credential = match credentials.authorize().await {
        Ok(credential) => credential,
        Err(e) => {
            tracing::error!("Google authorization failed: {}", e);
            if e.is_configuration() {
                tracing::error!("Run `content-agent auth` or check GOOGLE_APPLICATION_CREDENTIALS");
            }
            return Ok(RunReport::failed(RunStage::Authorization, e));
        }
    };

    let topics: Box<dyn TopicSource> = match &config.topics_file {
        Some(path) => {
            tracing::info!("Reading topics from {}", path.display());
            Box::new(LineFileTopics::new(path))
        }
        None => Box::new(StaticTopics::builtin()),
    };

    let generator = OpenRouterClient::new(
        config.openrouter_api_key.clone(),
        config.openrouter_base_url.clone(),
        config.request_timeout,
    )
    .context("Failed to build OpenRouter client")?;

    let publisher = DocumentPublisher::new(
        GoogleDocsClient::new(http.clone(), credential.access_token.clone()),
        GoogleDriveClient::new(http, credential.access_token),
    );

    let pipeline = ContentPipeline::new(
        TopicService::new(topics),
        ContentGenerator::new(generator, config.generation),
        publisher,
        config.drive_folder_id,
    );

    let report = pipeline.run(Local::now().date_naive()).await;
    log_report(&report);
    Ok(report)
}

fn log_report(report: &RunReport) {
    match report {
        RunReport::Completed {
            document_id,
            topic,
            folder_id,
        } => {
            tracing::info!("Run complete: '{}' filed in folder {}", topic, folder_id);
            tracing::info!("Document URL: {}", document_url(document_id));
        }
        RunReport::Unfiled {
            document_id,
            topic,
            reason,
        } => {
            tracing::warn!("Run complete but '{}' was not filed: {}", topic, reason);
            tracing::info!("Document URL: {}", document_url(document_id));
        }
        RunReport::Failed { stage, reason } => {
            tracing::error!("Run failed during {}: {}", stage, reason);
        }
    }
}
