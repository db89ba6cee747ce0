//! Error taxonomy shared by both operator tools.

/// Guidance printed when a remote API rejects the caller's credentials.
pub const SRE_ROLE_HINT: &str = "You need to request the Cloud Manager SRE role on Slack: \
     https://adobe.enterprise.slack.com/archives/C0648EGB1FY";

/// All errors that can end an operator run.
#[derive(thiserror::Error, Debug)]
pub enum OpsError {
    /// One or more required settings are absent or empty.
    #[error("Missing required configuration: {}", .missing.join(", "))]
    MissingConfig { missing: Vec<String> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The remote API answered 401 or 403.
    #[error("Authentication failed (status {status})")]
    Unauthorized { status: u16, hint: &'static str },

    /// A lookup that the workflow needs to progress came back empty.
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid selection: {0}")]
    Selection(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Header capture failed: {0}")]
    Capture(String),

    #[error("Clone failed: {0}")]
    Clone(String),

    /// The operator declined or interrupted an interactive step.
    #[error("Cancelled by user")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OpsError {
    /// Process exit status for this error. Cancellation at a confirmation
    /// gate is a clean exit.
    pub fn exit_code(&self) -> i32 {
        match self {
            OpsError::Cancelled => 0,
            _ => 1,
        }
    }

    /// Remediation text to print after the diagnostic, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            OpsError::Unauthorized { hint, .. } => Some(hint),
            OpsError::MissingConfig { .. } => Some("Please check your .env file"),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OpsError {
    fn from(err: reqwest::Error) -> Self {
        OpsError::Transport(err.to_string())
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, OpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_a_clean_exit() {
        assert_eq!(OpsError::Cancelled.exit_code(), 0);
        assert_eq!(OpsError::NotFound("no sites".into()).exit_code(), 1);
        assert_eq!(
            OpsError::Unauthorized {
                status: 403,
                hint: SRE_ROLE_HINT
            }
            .exit_code(),
            1
        );
    }

    #[test]
    fn missing_config_lists_every_key() {
        let err = OpsError::MissingConfig {
            missing: vec!["SPACECAT_API_KEY".into(), "REPO_PATH".into()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required configuration: SPACECAT_API_KEY, REPO_PATH"
        );
        assert!(err.hint().is_some());
    }
}
