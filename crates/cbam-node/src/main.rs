//! # CBAM Node
//!
//! Runs one emission accounting operation per invocation.
//!
//! ## Startup Sequence
//!
//! 1. Parse arguments (environment variables fill in missing flags)
//! 2. Initialize logging and metrics
//! 3. Seed the in-memory store from the dataset
//! 4. Dispatch the request, persisting the store even on failure
//! 5. Print the response envelope as JSON, then optionally metrics

use std::process::ExitCode;

use anyhow::{Context, Result};
use cbam_node::{dispatch_and_persist, Cli, NodeConfig, NodeContainer};
use cbam_telemetry::{gather_metrics, init_telemetry, TelemetryConfig};
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let _telemetry =
        init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let config = NodeConfig::from_cli(&cli).context("Invalid configuration")?;
    let print_metrics = config.print_metrics;
    let container = NodeContainer::new(config)?;

    let request = cli.command.into_request();
    info!(operation = %request.operation(), "Running operation");
    let response = dispatch_and_persist(&container, request).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to encode response")?
    );

    if print_metrics {
        print!("{}", gather_metrics().context("Failed to gather metrics")?);
    }

    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
