//! Capture headers, list repositories, pick one, clone it.

use tracing::info;

use autofix_core::{output, Result};

use crate::capture::{CaptureTarget, HeaderSource};
use crate::clone::{ensure_target_dir, run_clone};
use crate::config::CloneConfig;
use crate::filter::{filter_repositories, MatchRule};
use crate::repos::{Repository, SsgClient};

/// What was cloned, and where.
#[derive(Debug, Clone)]
pub struct Cloned {
    pub repository: Repository,
    pub rule: MatchRule,
    pub clone_command: String,
    pub stdout: String,
}

pub async fn run(config: &CloneConfig, headers: &dyn HeaderSource) -> Result<Cloned> {
    ensure_target_dir(&config.central_repo_dir)?;
    output::info(&format!("Using Program ID: {}", config.program_id));

    output::section("Step 1: Browser Authentication");
    let target = CaptureTarget {
        program_id: config.program_id.clone(),
        ssg_base: config.ssg_base.clone(),
        hal_browser_url: config.hal_browser_url.clone(),
    };
    let captured = headers.capture(&target).await?;
    let ssg = SsgClient::new(&config.ssg_base, &captured)?;

    output::section("Step 2: Fetching Repositories");
    let repositories = ssg.fetch_repositories(&config.program_id).await?;

    output::section("Step 3: Filtering Repositories");
    let found = filter_repositories(&repositories, &config.program_id)?;
    info!(
        repo = %found.repository.repo,
        rule = ?found.rule,
        primary_matches = found.primary_matches.len(),
        "repository selected"
    );
    let rule = found.rule;
    let selected = found.repository.clone();
    output::info(&format!("Repository ID: {}", selected.id));
    output::info(&format!("Repository Name: {}", selected.repo));
    output::info(&format!(
        "Repository URL: {}",
        selected.repository_url.as_deref().unwrap_or("N/A")
    ));

    output::section("Step 4: Getting Clone Command");
    let clone_command = ssg
        .fetch_clone_command(&config.program_id, &selected.id)
        .await?;
    output::success("Clone command retrieved");

    output::section("Step 5: Cloning Repository");
    output::info(&format!(
        "Target directory: {}",
        config.central_repo_dir.display()
    ));
    output::info(&format!("Command: {clone_command}"));
    let stdout = run_clone(&clone_command, &config.central_repo_dir, config.clone_timeout).await?;
    output::success("Repository cloned successfully!");
    if !stdout.trim().is_empty() {
        println!("{}", stdout.trim_end());
    }
    info!(repo = %selected.repo, "repository cloned");

    output::section("Complete");
    output::success(&format!(
        "Repository '{}' cloned to {}",
        selected.repo,
        config.central_repo_dir.display()
    ));

    Ok(Cloned {
        repository: selected,
        rule,
        clone_command,
        stdout,
    })
}
