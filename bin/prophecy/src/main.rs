//! prophecy deploys a prediction contract, seeds it with events and smoke-tests it.

mod cli;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use cli::Cli;
use prophecy_deploy::{RunConfig, execute};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = RunConfig::load(cli.config.as_deref())?;

    tracing::info!(
        rpc_url = %config.rpc_url,
        variant = %config.variant,
        "Configuration loaded"
    );

    match execute(&config).await {
        // Deployment and ownership failures come back as errors, so a report means success.
        Ok(report) => {
            println!("{report}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!(error = %err, "Run aborted");
            eprintln!("Run failed: {:#}", anyhow::Error::from(err));
            Ok(ExitCode::FAILURE)
        }
    }
}
