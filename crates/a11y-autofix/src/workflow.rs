//! The end-to-end requestor run: site, suggestion, archive, message, send.

use chrono::Local;
use tracing::{debug, info};

use autofix_core::{confirm, output, OpsError, Prompter, Result};

use crate::archive::{create_archive, repo_name, storage_key};
use crate::catalog::SpacecatClient;
use crate::config::AutofixConfig;
use crate::message::{CodeLocation, WorkRequest};
use crate::model::{analyze_suggestions, ValidSuggestion};
use crate::queue::MessageQueue;
use crate::select::{accessibility_opportunities, find_suggestion, select_site, select_suggestion};
use crate::storage::{s3_uri, upload_file, ObjectStore};

/// Opportunity type recorded for suggestions reached through direct ids.
const DIRECT_OPPORTUNITY_TYPE: &str = "accessibility";

/// How the operator identified what to fix.
#[derive(Debug, Clone, Default)]
pub struct WorkflowArgs {
    /// Fragment of the site's base URL.
    pub name: Option<String>,
    pub site_id: Option<String>,
    pub opportunity_id: Option<String>,
    pub suggestion_id: Option<String>,
    /// Include every suggestion sharing the selected aggregation key.
    pub send_all_issues: bool,
}

/// Remote collaborators of a run.
pub struct Backends<'a> {
    pub catalog: &'a SpacecatClient,
    pub store: &'a dyn ObjectStore,
    pub queue: &'a dyn MessageQueue,
}

/// A request that was accepted by the queue.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub message_id: String,
    pub request: WorkRequest,
}

/// Run the requestor once. Declining the final confirmation returns
/// [`OpsError::Cancelled`] with nothing sent.
pub async fn run(
    config: &AutofixConfig,
    args: &WorkflowArgs,
    backends: Backends<'_>,
    prompter: &mut dyn Prompter,
) -> Result<Dispatched> {
    let direct = direct_ids(args)?;

    output::section("Loading Configuration");
    output::success("Configuration loaded");
    output::info(&format!("API Base: {}", config.api_base));
    output::info(&format!("S3 Bucket: {}", config.s3_bucket));
    output::info(&format!("Repo Path: {}", config.repo_path.display()));

    output::section("Step 1: Finding Site");
    let site_id = resolve_site(args, backends.catalog, prompter).await?;

    let (selected, all) = match direct {
        Some((opportunity_id, suggestion_id)) => {
            use_direct_ids(backends.catalog, &site_id, opportunity_id, suggestion_id).await?
        }
        None => discover(backends.catalog, &site_id, prompter).await?,
    };

    output::section("Step 5: Preparing Code Archive");
    let key = ship_archive(config, backends.store).await?;

    output::section("Step 6: Creating SQS Message");
    if args.send_all_issues {
        output::info(&format!(
            "Sending all issues with aggregation key: {}",
            selected.aggregation_key
        ));
    } else {
        output::info("Sending single issue (use --send-all-issues to send all related issues)");
    }
    let request = WorkRequest::compose(
        &site_id,
        &selected,
        &all,
        args.send_all_issues,
        CodeLocation {
            bucket: &config.s3_bucket,
            key: &key,
        },
    );
    output::info("Message to be sent:");
    println!("\n{}\n", request.to_pretty()?);

    if !confirm(prompter, "Send this message? (Y/N): ")? {
        output::warning("Cancelled by user");
        return Err(OpsError::Cancelled);
    }

    output::section("Step 7: Sending Message");
    let message_id = backends
        .queue
        .send(&config.sqs_queue_url, &request.to_body()?)
        .await?;
    info!(%message_id, audit_id = %request.audit_id, "work request sent");

    output::success("Message sent successfully!");
    output::info(&format!("Message ID: {message_id}"));
    output::info(&format!("Site ID: {site_id}"));
    output::info(&format!("Opportunity ID: {}", selected.opportunity_id));
    output::info(&format!("Suggestion ID: {}", selected.id));
    output::info(&format!("S3 Path: {}", s3_uri(&config.s3_bucket, &key)));
    print_next_steps(&selected.opportunity_id);

    Ok(Dispatched {
        message_id,
        request,
    })
}

/// `--opportunity-id` and `--suggestion-id` only make sense together.
fn direct_ids(args: &WorkflowArgs) -> Result<Option<(&str, &str)>> {
    match (args.opportunity_id.as_deref(), args.suggestion_id.as_deref()) {
        (Some(opp), Some(sugg)) => Ok(Some((opp, sugg))),
        (None, None) => Ok(None),
        _ => Err(OpsError::InvalidConfig(
            "Both --opportunity-id and --suggestion-id must be provided together".to_string(),
        )),
    }
}

async fn resolve_site(
    args: &WorkflowArgs,
    catalog: &SpacecatClient,
    prompter: &mut dyn Prompter,
) -> Result<String> {
    match (&args.site_id, &args.name) {
        (Some(id), _) => {
            output::info(&format!("Using provided site ID: {id}"));
            Ok(id.clone())
        }
        (None, Some(name)) => {
            let sites = catalog.fetch_sites().await?;
            if sites.is_empty() {
                return Err(OpsError::NotFound("No sites found".to_string()));
            }
            Ok(select_site(&sites, name, prompter)?.id)
        }
        (None, None) => Err(OpsError::InvalidConfig(
            "one of --name or --site-id is required".to_string(),
        )),
    }
}

async fn use_direct_ids(
    catalog: &SpacecatClient,
    site_id: &str,
    opportunity_id: &str,
    suggestion_id: &str,
) -> Result<(ValidSuggestion, Vec<ValidSuggestion>)> {
    output::section("Step 2-4: Using Provided IDs");
    output::info(&format!("Opportunity ID: {opportunity_id}"));
    output::info(&format!("Suggestion ID: {suggestion_id}"));

    let raw = catalog.fetch_suggestions(site_id, opportunity_id).await?;
    if raw.is_empty() {
        return Err(OpsError::NotFound(format!(
            "No suggestions found for opportunity {opportunity_id}"
        )));
    }
    let valid = analyze_suggestions(&raw, opportunity_id, DIRECT_OPPORTUNITY_TYPE);
    let selected = find_suggestion(&valid, suggestion_id)
        .cloned()
        .ok_or_else(|| {
            OpsError::NotFound(format!(
                "Suggestion {suggestion_id} not found in opportunity {opportunity_id}"
            ))
        })?;
    output::success(&format!(
        "Found suggestion: {} - {}",
        selected.issue_type, selected.id
    ));
    Ok((selected, valid))
}

async fn discover(
    catalog: &SpacecatClient,
    site_id: &str,
    prompter: &mut dyn Prompter,
) -> Result<(ValidSuggestion, Vec<ValidSuggestion>)> {
    output::section("Step 2: Finding Opportunities");
    let opportunities = catalog.fetch_opportunities(site_id).await?;
    if opportunities.is_empty() {
        return Err(OpsError::NotFound(
            "No opportunities found for this site".to_string(),
        ));
    }
    output::success(&format!("Found {} opportunities", opportunities.len()));

    let (candidates, fallback) = accessibility_opportunities(&opportunities);
    if fallback {
        output::warning("No accessibility opportunities found, using all opportunities");
    } else {
        output::info(&format!(
            "Found {} accessibility opportunities",
            candidates.len()
        ));
    }

    output::section("Step 3: Finding Suggestions");
    let mut all = Vec::new();
    for opportunity in &candidates {
        let raw = catalog.fetch_suggestions(site_id, &opportunity.id).await?;
        let valid = analyze_suggestions(&raw, &opportunity.id, opportunity.kind());
        debug!(opportunity = %opportunity.id, raw = raw.len(), valid = valid.len(), "analyzed");
        all.extend(valid);
    }
    if all.is_empty() {
        return Err(OpsError::NotFound(
            "No valid suggestions found with aggregation keys".to_string(),
        ));
    }
    output::success(&format!("Found {} valid suggestions", all.len()));

    output::section("Step 4: Select Suggestion");
    let selected = select_suggestion(&all, prompter)?;
    output::success(&format!(
        "Selected: {} - {}",
        selected.issue_type, selected.id
    ));
    Ok((selected, all))
}

/// Archive the configured repository into a scratch directory and upload it.
/// Returns the object key. The scratch directory is removed on return.
async fn ship_archive(config: &AutofixConfig, store: &dyn ObjectStore) -> Result<String> {
    let source = &config.repo_path;
    if !source.is_dir() {
        return Err(OpsError::NotFound(format!(
            "Repo path does not exist: {}",
            source.display()
        )));
    }
    let name = repo_name(source)?;
    let key = storage_key(&name, Local::now().naive_local());

    let scratch = tempfile::tempdir()?;
    let tar_path = scratch.path().join(format!("{name}.tar.gz"));
    output::info(&format!("Creating archive of {}", source.display()));
    let summary = create_archive(source, &tar_path)?;
    output::success(&format!(
        "Archive created: {} entries, {:.2} MB",
        summary.entries,
        summary.size_mb()
    ));

    output::info(&format!("Uploading to {}", s3_uri(&config.s3_bucket, &key)));
    upload_file(store, &config.s3_bucket, &summary.path, &key).await?;
    output::success("Upload complete");
    Ok(key)
}

fn print_next_steps(opportunity_id: &str) {
    output::section("Next Steps");
    output::info("1. Monitor Mystique logs in Splunk:");
    println!(
        "   index=dx_aem_engineering sourcetype=dx_aem_sites_mystique_backend_dev \"{opportunity_id}\""
    );
    output::info("2. Check for generated diff in S3");
    output::info("3. Verify results in Spacecat opportunity");
}
