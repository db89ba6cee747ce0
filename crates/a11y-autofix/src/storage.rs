//! Object storage for source archives.

use std::path::Path;

use async_trait::async_trait;
use autofix_core::{OpsError, Result};
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use tracing::debug;

use crate::config::AwsCredentials;

/// Name reported by the static credentials provider.
pub(crate) const CREDENTIALS_PROVIDER: &str = "autofix-settings";

/// Destination for uploaded archives.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store the file at `path` as `bucket`/`key` in a single put.
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;
}

/// Amazon S3 backed store.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(credentials: &AwsCredentials) -> Self {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(Credentials::new(
                &credentials.access_key_id,
                &credentials.secret_access_key,
                credentials.session_token.clone(),
                None,
                CREDENTIALS_PROVIDER,
            ))
            .build();
        Self {
            client: aws_sdk_s3::Client::from_conf(config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| OpsError::Storage(format!("cannot read {}: {e}", path.display())))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| OpsError::Storage(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

/// Upload the file at `path` to `bucket`/`key`.
pub async fn upload_file(
    store: &dyn ObjectStore,
    bucket: &str,
    path: &Path,
    key: &str,
) -> Result<()> {
    let bytes = tokio::fs::metadata(path).await?.len();
    debug!(bucket, key, bytes, "uploading");
    store.put_file(bucket, key, path).await
}

/// S3 URI for display.
pub fn s3_uri(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}
