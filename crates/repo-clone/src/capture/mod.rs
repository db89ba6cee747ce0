//! Authenticated header capture.
//!
//! The clone workflow needs the header set a logged-in browser sends to the
//! SSG API. [`HeaderSource`] is the boundary: the Chromium implementation
//! lives in [`chromium`], tests use [`StaticHeaders`].
//!
//! While the browser is driven, staging identity and API hosts are rewritten
//! to production ([`rewrite_staging_url`]) and frames that land on the wrong
//! page are sent back to the repositories endpoint
//! ([`navigation_correction`]).

pub mod chromium;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autofix_core::{OpsError, Result};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

pub use chromium::{find_chromium, ChromiumCapture};

const PRODUCTION_AUTH_HOST: &str = "auth.services.adobe.com";
const STAGING_AUTH_HOSTS: [&str; 3] = [
    "auth-stg1.services.adobe.com",
    "auth-stg2.services.adobe.com",
    "auth-stg.services.adobe.com",
];
const STAGING_SUFFIXES: [&str; 3] = ["-stg1.", "-stg2.", "-stg."];
const STAGING_MARKERS: [&str; 3] = ["auth-stg", "stg1", "stg2"];
const DEV_SSG_HOST: &str = "ssg-dev.adobe.io";
const PRODUCTION_SSG_HOST: &str = "ssg.adobe.io";

/// Headers owned by the HTTP client rather than the session.
const TRANSPORT_HEADERS: [&str; 4] = ["host", "content-length", "connection", "accept-encoding"];

/// Header name to value, as sent by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthHeaders(BTreeMap<String, String>);

impl AuthHeaders {
    /// Convert a DevTools header object. Non-string values are kept in their
    /// JSON form; HTTP/2 pseudo headers and transport headers are dropped.
    pub fn from_json(value: &Value) -> Self {
        let map = value
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter(|(name, _)| {
                        !name.starts_with(':')
                            && !TRANSPORT_HEADERS.iter().any(|t| name.eq_ignore_ascii_case(t))
                    })
                    .map(|(name, value)| {
                        let text = match value {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (name.clone(), text)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self(map)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AuthHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// What the browser should load and which request carries the headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub program_id: String,
    /// SSG API origin, no trailing slash.
    pub ssg_base: String,
    /// Page that renders the HAL API named in its fragment.
    pub hal_browser_url: String,
}

impl CaptureTarget {
    /// `{ssg}/api/program/{id}/repositories`
    pub fn repositories_url(&self) -> String {
        format!(
            "{}/api/program/{}/repositories",
            self.ssg_base, self.program_id
        )
    }

    /// HAL browser page with the repositories endpoint as its fragment.
    pub fn entry_url(&self) -> String {
        format!("{}#{}", self.hal_browser_url, self.repositories_url())
    }

    /// Whether a request to `url` carries the headers worth capturing.
    pub fn is_capture_request(&self, url: &str) -> bool {
        url.contains(&self.repositories_url())
    }
}

/// Rewrite staging hosts in an outgoing request URL to their production
/// counterparts. URLs without staging markers come back unchanged.
pub fn rewrite_staging_url(url: &str) -> String {
    let mut rewritten = url.to_string();
    if STAGING_MARKERS.iter().any(|m| url.contains(m)) {
        rewritten = rewrite_auth_hosts(&rewritten);
        for suffix in STAGING_SUFFIXES {
            rewritten = rewritten.replace(suffix, ".");
        }
    }
    rewritten.replace(DEV_SSG_HOST, PRODUCTION_SSG_HOST)
}

fn rewrite_auth_hosts(url: &str) -> String {
    STAGING_AUTH_HOSTS
        .iter()
        .fold(url.to_string(), |acc, host| acc.replace(host, PRODUCTION_AUTH_HOST))
}

/// Where a frame that landed on `current` should be sent instead, if
/// anywhere. Covers staging identity hosts, the dev SSG host, and a HAL
/// fragment that points at the API root rather than the repositories list.
pub fn navigation_correction(current: &str, target: &CaptureTarget) -> Option<String> {
    let mut corrected = current.to_string();
    if STAGING_MARKERS.iter().any(|m| current.contains(m)) {
        corrected = rewrite_auth_hosts(&corrected);
    }
    corrected = corrected.replace(DEV_SSG_HOST, PRODUCTION_SSG_HOST);

    let api_fragment = format!("#{}/api", target.ssg_base);
    if corrected.contains(&api_fragment) && !corrected.contains("repositories") {
        let wanted = format!("#{}", target.repositories_url());
        corrected = corrected.replacen(&api_fragment, &wanted, 1);
    }

    (corrected != current).then_some(corrected)
}

/// Progress of one capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    BrowserLaunched,
    Navigating,
    AwaitingCapture,
    Captured,
    TimedOut,
}

impl CaptureState {
    pub fn can_advance_to(self, next: CaptureState) -> bool {
        use CaptureState::*;
        matches!(
            (self, next),
            (Idle, BrowserLaunched)
                | (BrowserLaunched, Navigating)
                | (Navigating, AwaitingCapture)
                | (AwaitingCapture, Captured)
                | (AwaitingCapture, TimedOut)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CaptureState::Captured | CaptureState::TimedOut)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::BrowserLaunched => "browser-launched",
            CaptureState::Navigating => "navigating",
            CaptureState::AwaitingCapture => "awaiting-capture",
            CaptureState::Captured => "captured",
            CaptureState::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// Waits used while driving the browser.
#[derive(Debug, Clone, Copy)]
pub struct CaptureTimings {
    /// Limit on the initial navigation; exceeding it is only a warning.
    pub navigation: Duration,
    /// Limit on each corrective navigation.
    pub correction: Duration,
    /// Pause before the first poll.
    pub settle: Duration,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
}

impl CaptureTimings {
    /// Deadline the DevTools handler applies to each navigation. It must not
    /// cut the outer navigation or correction limits short.
    pub fn request_timeout(&self) -> Duration {
        self.navigation.max(self.correction)
    }
}

impl Default for CaptureTimings {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(300),
            correction: Duration::from_secs(60),
            settle: Duration::from_secs(5),
            poll_interval: Duration::from_secs(5),
            poll_attempts: 60,
        }
    }
}

#[derive(Debug, Default)]
struct SlotInner {
    state: CaptureState,
    headers: Option<AuthHeaders>,
    requests: usize,
    api_requests: usize,
    corrections: usize,
    last_api_url: Option<String>,
}

/// State shared between the request interceptor, the navigation watcher and
/// the polling control flow.
#[derive(Debug, Clone, Default)]
pub struct CaptureSlot {
    inner: Arc<Mutex<SlotInner>>,
}

impl CaptureSlot {
    pub async fn state(&self) -> CaptureState {
        self.inner.lock().await.state
    }

    /// Move to `next`, rejecting transitions the capture flow never makes.
    pub async fn advance(&self, next: CaptureState) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.state.can_advance_to(next) {
            return Err(OpsError::Capture(format!(
                "invalid transition {} -> {next}",
                inner.state
            )));
        }
        debug!(from = %inner.state, to = %next, "capture state");
        inner.state = next;
        Ok(())
    }

    /// Record an outgoing request. The first request matching `target`
    /// stores `headers()`; later matches are counted but ignored. Returns
    /// whether this request was the one captured.
    pub async fn observe_request(
        &self,
        url: &str,
        target: &CaptureTarget,
        headers: impl FnOnce() -> AuthHeaders,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        inner.requests += 1;
        if url.contains(&target.ssg_base) {
            inner.api_requests += 1;
            inner.last_api_url = Some(url.to_string());
        }
        if inner.headers.is_none() && target.is_capture_request(url) {
            inner.headers = Some(headers());
            return true;
        }
        false
    }

    pub async fn note_correction(&self) {
        self.inner.lock().await.corrections += 1;
    }

    pub async fn headers(&self) -> Option<AuthHeaders> {
        self.inner.lock().await.headers.clone()
    }

    /// Wait `settle`, then check for captured headers every `poll_interval`
    /// up to `poll_attempts` times.
    pub async fn wait_for_headers(&self, timings: &CaptureTimings) -> Option<AuthHeaders> {
        tokio::time::sleep(timings.settle).await;
        for attempt in 0..timings.poll_attempts {
            if let Some(headers) = self.headers().await {
                return Some(headers);
            }
            if attempt % 10 == 0 {
                let inner = self.inner.lock().await;
                debug!(
                    attempt = attempt + 1,
                    of = timings.poll_attempts,
                    requests = inner.requests,
                    api_requests = inner.api_requests,
                    corrections = inner.corrections,
                    last_api_url = inner.last_api_url.as_deref().unwrap_or("-"),
                    "waiting for API call"
                );
            }
            tokio::time::sleep(timings.poll_interval).await;
        }
        self.headers().await
    }
}

/// Supplier of the authenticated header bundle.
#[async_trait]
pub trait HeaderSource: Send + Sync {
    async fn capture(&self, target: &CaptureTarget) -> Result<AuthHeaders>;
}

/// Fixed headers, for tests and for replaying a previously captured set.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders(pub AuthHeaders);

#[async_trait]
impl HeaderSource for StaticHeaders {
    async fn capture(&self, _target: &CaptureTarget) -> Result<AuthHeaders> {
        if self.0.is_empty() {
            return Err(OpsError::Capture(
                "Failed to capture authentication headers".to_string(),
            ));
        }
        Ok(self.0.clone())
    }
}
