//! Running the clone command returned by SSG.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use autofix_core::{output, OpsError, Result};

/// Create `dir` (and parents) if missing. Returns whether it was created.
pub fn ensure_target_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        return Ok(false);
    }
    output::warning(&format!(
        "CENTRAL_REPO_DIR does not exist: {}",
        dir.display()
    ));
    output::info("Creating directory...");
    std::fs::create_dir_all(dir)?;
    output::success(&format!("Created directory: {}", dir.display()));
    Ok(true)
}

fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Run `command` through the platform shell inside `dir`. Returns captured
/// stdout. A non-zero exit or exceeding `timeout` fails; the child is killed
/// when the timeout fires.
pub async fn run_clone(command: &str, dir: &Path, timeout: Duration) -> Result<String> {
    debug!(dir = %dir.display(), "running clone command");
    let child = shell(command)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| OpsError::Clone(format!("failed to execute clone command: {e}")))?;

    let result = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(OpsError::Clone(format!(
                "clone operation timed out ({} s)",
                timeout.as_secs()
            )))
        }
    };

    let stdout = String::from_utf8_lossy(&result.stdout).into_owned();
    if result.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&result.stderr);
    if !stderr.trim().is_empty() {
        println!("{}", stderr.trim_end());
    }
    let code = result
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    Err(OpsError::Clone(format!("clone failed with exit code {code}")))
}
