// This is the entry point of the content automation agent.
//
// **Architecture Overview:**
// - `core/` = Business logic (topics, generation, publishing, credentials, pipeline)
// - `infra/` = Implementations of core traits (OpenRouter, Google APIs, files)
// - `cli/` = Command adapters (run, auth, check-key)
//
// This file's job is to:
// 1. Set up logging and load `.env`
// 2. Pick the command from argv
// 3. Turn the command's outcome into a process exit code

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::cli::Command;
use crate::core::pipeline::RunReport;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging so we can see what's happening; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let command = match Command::from_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    match command {
        Command::Run => match cli::run::execute().await {
            Ok(report) => exit_code_for(&report),
            Err(e) => {
                tracing::error!("{:#}", e);
                ExitCode::FAILURE
            }
        },
        Command::Auth => finish(cli::auth::execute().await),
        Command::CheckKey(path) => finish(cli::check_key::execute(path).await),
    }
}

fn finish(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// A document that exists but was not filed still counts as a successful run.
fn exit_code_for(report: &RunReport) -> ExitCode {
    if report.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
