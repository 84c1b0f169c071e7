// Runtime configuration, read once from the environment at start-up.
//
// `.env` is loaded in main.rs before any of this runs. Google settings are
// split out so `content-agent auth` works without a generation API key.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::core::content::content_models::{DEFAULT_MODELS, DEFAULT_PROMPT_TEMPLATE};
use crate::core::content::GenerationSettings;
use crate::core::credentials::REQUIRED_SCOPES;
use crate::core::publishing::usable_folder_id;
use crate::infra::ai::openrouter_client::DEFAULT_BASE_URL;
use crate::infra::google::AuthFlowKind;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Everything Google-related: where tokens live and how to get new ones.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub token_file: PathBuf,
    pub client_secrets: PathBuf,
    /// Set → unattended service-account mode.
    pub service_account_key: Option<PathBuf>,
    pub auth_flow: AuthFlowKind,
    pub auth_port: u16,
    pub scopes: Vec<String>,
    /// Applies to every Google call, token endpoint included.
    pub request_timeout: Duration,
}

impl GoogleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token_file = var("GOOGLE_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("token.json"));
        let client_secrets = var("GOOGLE_CLIENT_SECRETS")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("credentials.json"));
        let service_account_key = var("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from);

        let auth_flow = match var("GOOGLE_AUTH_FLOW") {
            Some(raw) => raw
                .parse::<AuthFlowKind>()
                .map_err(|e| ConfigError::InvalidValue("GOOGLE_AUTH_FLOW".to_string(), e))?,
            None => AuthFlowKind::Loopback,
        };
        let auth_port = parse_or("GOOGLE_AUTH_PORT", var("GOOGLE_AUTH_PORT"), 0u16)?;
        let timeout_secs = parse_or(
            "CONTENT_REQUEST_TIMEOUT_SECS",
            var("CONTENT_REQUEST_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?;

        Ok(Self {
            token_file,
            client_secrets,
            service_account_key,
            auth_flow,
            auth_port,
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Holds all configuration needed for a pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    pub openrouter_api_key: String,
    pub openrouter_base_url: String,
    pub request_timeout: Duration,
    pub generation: GenerationSettings,
    pub topics_file: Option<PathBuf>,
    /// Already filtered: `None` when unset, blank or the placeholder.
    pub drive_folder_id: Option<String>,
    pub google: GoogleConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let openrouter_api_key = var("OPENROUTER_API_KEY")
            .ok_or_else(|| ConfigError::MissingVar("OPENROUTER_API_KEY".to_string()))?;
        let openrouter_base_url =
            var("OPENROUTER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // --- Generation ---
        let models = match var("OPENROUTER_MODELS") {
            Some(raw) => {
                let models = parse_models(&raw);
                if models.is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "OPENROUTER_MODELS".to_string(),
                        "no model names in list".to_string(),
                    ));
                }
                models
            }
            None => DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        };
        let max_tokens = parse_or("CONTENT_MAX_TOKENS", var("CONTENT_MAX_TOKENS"), 2000u32)?;
        let temperature = parse_or("CONTENT_TEMPERATURE", var("CONTENT_TEMPERATURE"), 0.7f32)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue(
                "CONTENT_TEMPERATURE".to_string(),
                format!("{} is outside 0.0..=2.0", temperature),
            ));
        }
        let backoff_secs = parse_or(
            "CONTENT_BACKOFF_UNIT_SECS",
            var("CONTENT_BACKOFF_UNIT_SECS"),
            1u64,
        )?;
        let prompt_template = match var("CONTENT_PROMPT_FILE") {
            Some(path) => std::fs::read_to_string(&path).map_err(|e| {
                ConfigError::InvalidValue(
                    "CONTENT_PROMPT_FILE".to_string(),
                    format!("cannot read {}: {}", path, e),
                )
            })?,
            None => DEFAULT_PROMPT_TEMPLATE.to_string(),
        };

        // --- Sources & destinations ---
        let topics_file = var("TOPICS_FILE").map(PathBuf::from);
        let drive_folder_id = folder_id_from(var("GOOGLE_DRIVE_FOLDER_ID"));

        let google = GoogleConfig::from_env()?;

        Ok(Self {
            openrouter_api_key,
            openrouter_base_url,
            request_timeout: google.request_timeout,
            generation: GenerationSettings {
                models,
                max_tokens,
                temperature,
                backoff_unit: Duration::from_secs(backoff_secs),
                prompt_template,
            },
            topics_file,
            drive_folder_id,
            google,
        })
    }
}

/// A set, non-blank environment variable.
fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse::<T>().map_err(|e| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}': {}", raw, e))
        }),
        None => Ok(default),
    }
}

fn parse_models(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn folder_id_from(raw: Option<String>) -> Option<String> {
    usable_folder_id(raw.as_deref()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_list_is_split_and_trimmed() {
        assert_eq!(
            parse_models(" a/one , b/two:free,, ,c/three "),
            vec!["a/one", "b/two:free", "c/three"]
        );
        assert!(parse_models(" , ").is_empty());
    }

    #[test]
    fn placeholder_folder_means_no_folder() {
        assert_eq!(folder_id_from(Some("your_folder_id_here".to_string())), None);
        assert_eq!(folder_id_from(None), None);
        assert_eq!(
            folder_id_from(Some("1AbCdEf".to_string())),
            Some("1AbCdEf".to_string())
        );
    }

    #[test]
    fn unset_values_fall_back_to_default() {
        assert_eq!(parse_or("CONTENT_MAX_TOKENS", None, 2000u32).unwrap(), 2000);
        assert_eq!(
            parse_or("CONTENT_MAX_TOKENS", Some("512".to_string()), 2000u32).unwrap(),
            512
        );
    }

    #[test]
    fn unparsable_value_names_the_variable() {
        let err = parse_or("CONTENT_TEMPERATURE", Some("warm".to_string()), 0.7f32).unwrap_err();
        match err {
            ConfigError::InvalidValue(name, detail) => {
                assert_eq!(name, "CONTENT_TEMPERATURE");
                assert!(detail.contains("warm"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
