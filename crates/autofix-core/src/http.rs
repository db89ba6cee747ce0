//! Authenticated JSON reads over reqwest.
//!
//! Not a retrying client: every request is issued once with a fixed timeout.
//! 401/403 map to [`OpsError::Unauthorized`] so callers can stop the run with
//! a remediation hint instead of trying again.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{OpsError, Result};

const USER_AGENT: &str = concat!("autofix-tools/", env!("CARGO_PKG_VERSION"));

/// Hint attached to authentication failures when none is configured.
pub const DEFAULT_AUTH_HINT: &str = "Check that your API credentials are valid for this service";

/// JSON API client that sends the same header set with every request.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    headers: HeaderMap,
    auth_hint: &'static str,
}

impl ApiClient {
    /// Build a client from header name/value pairs. Pairs that are not valid
    /// HTTP headers are skipped.
    pub fn new<I, K, V>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OpsError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            headers: header_map(headers),
            auth_hint: DEFAULT_AUTH_HINT,
        })
    }

    /// Replace the remediation text attached to 401/403 errors.
    pub fn with_auth_hint(mut self, hint: &'static str) -> Self {
        self.auth_hint = hint;
        self
    }

    /// Number of headers sent with every request.
    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    /// GET `url` and decode the JSON body as `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, timeout: Duration) -> Result<T> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        debug!(%url, status, "response");
        match status {
            401 | 403 => Err(OpsError::Unauthorized {
                status,
                hint: self.auth_hint,
            }),
            s if !(200..300).contains(&s) => Err(OpsError::Status {
                status: s,
                url: url.to_string(),
            }),
            _ => Ok(response.json::<T>().await?),
        }
    }
}

fn header_map<I, K, V>(headers: I) -> HeaderMap
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let (name, value) = (name.as_ref(), value.as_ref());
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                map.insert(n, v);
            }
            _ => debug!(header = name, "skipping header that is not valid HTTP"),
        }
    }
    map
}

/// Join an API base URL and an absolute path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
