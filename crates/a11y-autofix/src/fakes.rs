//! In-memory object store and queue for tests and dry runs.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use autofix_core::{OpsError, Result};

use crate::queue::MessageQueue;
use crate::storage::ObjectStore;

/// Records every put as `(bucket, key, body)`.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<Vec<(String, String, Vec<u8>)>>,
    fail_with: Option<String>,
}

impl MemoryObjectStore {
    /// A store whose every put fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            objects: Mutex::default(),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn objects(&self) -> Vec<(String, String, Vec<u8>)> {
        self.objects.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        if let Some(reason) = &self.fail_with {
            return Err(OpsError::Storage(reason.clone()));
        }
        let body = tokio::fs::read(path).await?;
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| OpsError::Storage("store poisoned".to_string()))?;
        objects.push((bucket.to_string(), key.to_string(), body));
        Ok(())
    }
}

/// Records every sent body as `(queue_url, body)` and hands out sequential ids.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    sent: Mutex<Vec<(String, String)>>,
    fail_with: Option<String>,
}

impl MemoryQueue {
    /// A queue whose every send fails with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self {
            sent: Mutex::default(),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MessageQueue for MemoryQueue {
    async fn send(&self, queue_url: &str, body: &str) -> Result<String> {
        if let Some(reason) = &self.fail_with {
            return Err(OpsError::Queue(reason.clone()));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| OpsError::Queue("queue poisoned".to_string()))?;
        sent.push((queue_url.to_string(), body.to_string()));
        Ok(format!("msg-{}", sent.len()))
    }
}
