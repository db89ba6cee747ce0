//! Work-request delivery.

use async_trait::async_trait;
use autofix_core::{OpsError, Result};
use aws_sdk_sqs::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_sqs::error::DisplayErrorContext;

use crate::config::AwsCredentials;
use crate::storage::CREDENTIALS_PROVIDER;

/// A queue that accepts one message body and returns the provider's id.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn send(&self, queue_url: &str, body: &str) -> Result<String>;
}

/// Amazon SQS backed queue.
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
}

impl SqsQueue {
    pub fn new(credentials: &AwsCredentials) -> Self {
        let config = aws_sdk_sqs::Config::builder()
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
            client: aws_sdk_sqs::Client::from_conf(config),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send(&self, queue_url: &str, body: &str) -> Result<String> {
        let output = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| OpsError::Queue(DisplayErrorContext(&e).to_string()))?;

        output
            .message_id()
            .map(str::to_string)
            .ok_or_else(|| OpsError::Queue("response carried no message id".to_string()))
    }
}
