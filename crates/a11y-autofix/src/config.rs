//! Typed configuration for the autofix requestor.

use std::path::PathBuf;

use autofix_core::{OpsError, Result, Settings};

pub const DEFAULT_API_BASE: &str = "https://spacecat.experiencecloud.live/api/ci";
pub const DEFAULT_BUCKET: &str = "spacecat-dev-mystique-assets";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Settings that must be present before the workflow starts.
pub const REQUIRED_KEYS: [&str; 4] = [
    "SPACECAT_API_KEY",
    "SPACECAT_IMS_ORG_ID",
    "SQS_SPACECAT_TO_MYSTIQUE_QUEUE_URL",
    "REPO_PATH",
];

/// Resolved, validated configuration.
#[derive(Debug, Clone)]
pub struct AutofixConfig {
    pub api_base: String,
    pub api_key: String,
    pub ims_org_id: String,
    pub s3_bucket: String,
    pub sqs_queue_url: String,
    pub aws_region: String,
    pub repo_path: PathBuf,
}

impl AutofixConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.require(&REQUIRED_KEYS)?;
        let required = |key: &str| {
            settings
                .get(key)
                .map(str::to_string)
                .ok_or_else(|| OpsError::MissingConfig {
                    missing: vec![key.to_string()],
                })
        };

        Ok(Self {
            api_base: settings
                .get_or("SPACECAT_API_BASE", DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            api_key: required("SPACECAT_API_KEY")?,
            ims_org_id: required("SPACECAT_IMS_ORG_ID")?,
            s3_bucket: settings.get_or("S3_BUCKET_NAME", DEFAULT_BUCKET).to_string(),
            sqs_queue_url: required("SQS_SPACECAT_TO_MYSTIQUE_QUEUE_URL")?,
            aws_region: settings.get_or("AWS_REGION", DEFAULT_REGION).to_string(),
            repo_path: PathBuf::from(required("REPO_PATH")?),
        })
    }

    /// Headers sent with every Spacecat request.
    pub fn api_headers(&self) -> Vec<(String, String)> {
        vec![
            ("x-api-key".to_string(), self.api_key.clone()),
            ("x-gw-ims-org-id".to_string(), self.ims_org_id.clone()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }
}

/// Static AWS credentials. Tool-specific `SPACECAT_AWS_*` variables win over
/// the generic `AWS_*` ones.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
}

impl AwsCredentials {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let access_key_id = settings.first_of(&["SPACECAT_AWS_ACCESS_KEY_ID", "AWS_ACCESS_KEY_ID"]);
        let secret_access_key =
            settings.first_of(&["SPACECAT_AWS_SECRET_ACCESS_KEY", "AWS_SECRET_ACCESS_KEY"]);

        match (access_key_id, secret_access_key) {
            (Some(id), Some(secret)) => Ok(Self {
                access_key_id: id.to_string(),
                secret_access_key: secret.to_string(),
                session_token: settings
                    .first_of(&["SPACECAT_AWS_SESSION_TOKEN", "AWS_SESSION_TOKEN"])
                    .map(str::to_string),
                region: settings.get_or("AWS_REGION", DEFAULT_REGION).to_string(),
            }),
            (id, secret) => {
                let mut missing = Vec::new();
                if id.is_none() {
                    missing.push("AWS_ACCESS_KEY_ID".to_string());
                }
                if secret.is_none() {
                    missing.push("AWS_SECRET_ACCESS_KEY".to_string());
                }
                Err(OpsError::MissingConfig { missing })
            }
        }
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("region", &self.region)
            .finish()
    }
}
