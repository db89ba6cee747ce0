//! Typed configuration for the clone tool.

use std::path::PathBuf;
use std::time::Duration;

use autofix_core::{OpsError, Result, Settings};

pub const DEFAULT_SSG_BASE: &str = "https://ssg.adobe.io";
pub const DEFAULT_HAL_BROWSER_URL: &str =
    "https://git.corp.adobe.com/pages/experience-platform/self-service-hal-browser/";

/// Wall-clock limit for the clone command.
pub const CLONE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct CloneConfig {
    /// Directory the repository is cloned into.
    pub central_repo_dir: PathBuf,
    pub program_id: String,
    pub ssg_base: String,
    pub hal_browser_url: String,
    pub chromium_path: Option<PathBuf>,
    pub headless: bool,
    pub clone_timeout: Duration,
}

impl CloneConfig {
    /// `program_id` and `headless` come from the command line and win over
    /// `PROGRAM_ID` / `BROWSER_HEADLESS`.
    pub fn from_settings(
        settings: &Settings,
        program_id: Option<&str>,
        headless: bool,
    ) -> Result<Self> {
        settings.require(&["CENTRAL_REPO_DIR"])?;
        let central_repo_dir = settings
            .get("CENTRAL_REPO_DIR")
            .map(PathBuf::from)
            .ok_or_else(|| OpsError::MissingConfig {
                missing: vec!["CENTRAL_REPO_DIR".to_string()],
            })?;

        let program_id = program_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .or_else(|| settings.get("PROGRAM_ID"))
            .ok_or_else(|| OpsError::MissingConfig {
                missing: vec!["PROGRAM_ID (or --program-id)".to_string()],
            })?;
        validate_program_id(program_id)?;

        Ok(Self {
            central_repo_dir,
            program_id: program_id.to_string(),
            ssg_base: settings
                .get_or("SSG_API_BASE", DEFAULT_SSG_BASE)
                .trim_end_matches('/')
                .to_string(),
            hal_browser_url: settings
                .get_or("HAL_BROWSER_URL", DEFAULT_HAL_BROWSER_URL)
                .to_string(),
            chromium_path: settings.get("CHROMIUM_PATH").map(PathBuf::from),
            headless: headless || settings.flag("BROWSER_HEADLESS", false),
            clone_timeout: CLONE_TIMEOUT,
        })
    }
}

/// Program ids are numeric; they end up in URLs and a regex.
fn validate_program_id(id: &str) -> Result<()> {
    if id.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(OpsError::InvalidConfig(format!(
            "program id must be numeric, got '{id}'"
        )))
    }
}
