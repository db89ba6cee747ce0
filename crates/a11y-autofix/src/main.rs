// Copyright 2026 Autofix Tools Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};

use a11y_autofix::workflow::{self, Backends, WorkflowArgs};
use a11y_autofix::{AutofixConfig, AwsCredentials, S3ObjectStore, SpacecatClient, SqsQueue};
use autofix_core::{config, output, OpsError, TerminalPrompter};

const EXAMPLES: &str = "\
Examples:
  # Search for a site by name
  a11y-autofix --name sunstargum

  # Use a site ID directly
  a11y-autofix --site-id d2960efd-a226-4b15-b5ec-b64ccb99995e

  # Skip discovery with explicit IDs
  a11y-autofix --site-id <site-id> --opportunity-id <opp-id> --suggestion-id <sugg-id>

  # Send every issue sharing the selected aggregation key
  a11y-autofix --name sunstargum --send-all-issues";

#[derive(Parser)]
#[command(
    name = "a11y-autofix",
    about = "A11y Autofix Requestor: send accessibility fix requests to Mystique",
    version,
    after_help = EXAMPLES
)]
#[command(group(ArgGroup::new("site").required(true).args(["name", "site_id"])))]
struct Cli {
    /// Partial site name to search (e.g. 'sunstargum', 'krisshop')
    #[arg(long)]
    name: Option<String>,

    /// Direct site ID (bypasses name search)
    #[arg(long)]
    site_id: Option<String>,

    /// Direct opportunity ID (requires --suggestion-id)
    #[arg(long)]
    opportunity_id: Option<String>,

    /// Direct suggestion ID (requires --opportunity-id)
    #[arg(long)]
    suggestion_id: Option<String>,

    /// Send every issue sharing the selected suggestion's aggregation key
    #[arg(long)]
    send_all_issues: bool,

    /// Settings file to read instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    output::section("A11y Autofix Requestor");
    if let Err(err) = execute(cli).await {
        std::process::exit(report(&err));
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let settings = config::load(cli.env_file.as_deref()).context("loading configuration")?;
    if let Some(source) = settings.source() {
        tracing::debug!(path = %source.display(), "settings file read");
    }
    let config = AutofixConfig::from_settings(&settings)?;
    let credentials = AwsCredentials::from_settings(&settings)?;

    let catalog = SpacecatClient::new(&config)?;
    let store = S3ObjectStore::new(&credentials);
    let queue = SqsQueue::new(&credentials);
    let mut prompter = TerminalPrompter::new();

    let args = WorkflowArgs {
        name: cli.name,
        site_id: cli.site_id,
        opportunity_id: cli.opportunity_id,
        suggestion_id: cli.suggestion_id,
        send_all_issues: cli.send_all_issues,
    };
    let backends = Backends {
        catalog: &catalog,
        store: &store,
        queue: &queue,
    };
    workflow::run(&config, &args, backends, &mut prompter).await?;
    Ok(())
}

/// Print the failure for the operator and pick the exit status.
fn report(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<OpsError>() {
        Some(OpsError::Cancelled) => 0,
        Some(ops) => {
            output::error(&format!("{err:#}"));
            if let Some(hint) = ops.hint() {
                output::info(hint);
            }
            ops.exit_code()
        }
        None => {
            output::error(&format!("{err:#}"));
            1
        }
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
