// Copyright 2026 Autofix Tools Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use autofix_core::{config, output, OpsError};
use repo_clone::{workflow, ChromiumCapture, CloneConfig};

const AFTER_HELP: &str = "\
Examples:
  # Clone the repository of a specific program
  customer-repo-clone --program-id 42155

  # Use PROGRAM_ID from the settings file
  customer-repo-clone

Configuration:
  CENTRAL_REPO_DIR must be set to the directory repositories are cloned into.
  PROGRAM_ID may be set instead of passing --program-id.

Requirements:
  - Google Chrome or Chromium (or CHROMIUM_PATH pointing at one)
  - The Cloud Manager SRE role for the program";

#[derive(Parser)]
#[command(
    name = "customer-repo-clone",
    about = "Customer Repository Clone Tool: clone customer repos with SSO authentication",
    version,
    after_help = AFTER_HELP
)]
struct Cli {
    /// Cloud Manager program ID (falls back to PROGRAM_ID)
    #[arg(long)]
    program_id: Option<String>,

    /// Settings file to read instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Run the browser without a window (login must already be cached)
    #[arg(long)]
    headless: bool,

    /// Enable verbose/debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    output::section("Customer Repository Clone Tool");
    if let Err(err) = execute(cli).await {
        std::process::exit(report(&err));
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let settings = config::load(cli.env_file.as_deref()).context("loading configuration")?;
    if let Some(source) = settings.source() {
        output::success(&format!("Loaded configuration from {}", source.display()));
    }
    let config = CloneConfig::from_settings(&settings, cli.program_id.as_deref(), cli.headless)?;

    let capture = ChromiumCapture::new(config.chromium_path.as_deref(), config.headless)?;
    workflow::run(&config, &capture).await?;
    Ok(())
}

/// Print the failure for the operator and pick the exit status.
fn report(err: &anyhow::Error) -> i32 {
    output::error(&format!("{err:#}"));
    match err.downcast_ref::<OpsError>() {
        Some(ops) => {
            if let Some(hint) = ops.hint() {
                output::info(hint);
            }
            ops.exit_code()
        }
        None => 1,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
