//! Header capture through a real Chromium session, using chromiumoxide.
//!
//! Three cooperative tasks run next to the control flow: the DevTools event
//! handler, a Fetch-domain interceptor that rewrites staging hosts and
//! records the repositories request, and a watcher that re-navigates frames
//! landing on the wrong page. The control flow only polls the shared
//! [`CaptureSlot`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::page::EventFrameNavigated;
use chromiumoxide::error::CdpError;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tracing::{debug, warn};

use autofix_core::{output, OpsError, Result};

use super::{
    navigation_correction, rewrite_staging_url, AuthHeaders, CaptureSlot, CaptureState,
    CaptureTarget, CaptureTimings, HeaderSource,
};

/// Find a Chromium binary: an explicit path first, then the system `PATH`,
/// then a Playwright-managed download, then the usual macOS install.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "configured Chromium path does not exist");
    }

    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if let Some(path) = playwright_chromium() {
        return Some(path);
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Newest `chromium-*` build under the Playwright browser cache.
fn playwright_chromium() -> Option<PathBuf> {
    let cache = dirs::cache_dir()?.join("ms-playwright");
    let mut builds: Vec<PathBuf> = std::fs::read_dir(&cache)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("chromium-"))
        })
        .collect();
    builds.sort();

    let relative = if cfg!(target_os = "macos") {
        vec!["chrome-mac/Chromium.app/Contents/MacOS/Chromium"]
    } else {
        vec!["chrome-linux/chrome", "chrome-linux64/chrome"]
    };
    builds.iter().rev().find_map(|build| {
        relative
            .iter()
            .map(|rel| build.join(rel))
            .find(|candidate| candidate.exists())
    })
}

/// Captures headers by letting the operator log in through Chromium.
pub struct ChromiumCapture {
    executable: PathBuf,
    headless: bool,
    timings: CaptureTimings,
}

impl ChromiumCapture {
    pub fn new(explicit: Option<&Path>, headless: bool) -> Result<Self> {
        let executable = find_chromium(explicit).ok_or_else(|| {
            OpsError::Capture(
                "Chromium not found. Install Google Chrome or set CHROMIUM_PATH".to_string(),
            )
        })?;
        debug!(path = %executable.display(), headless, "using Chromium");
        Ok(Self {
            executable,
            headless,
            timings: CaptureTimings::default(),
        })
    }

    pub fn with_timings(mut self, timings: CaptureTimings) -> Self {
        self.timings = timings;
        self
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .request_timeout(self.timings.request_timeout())
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if !self.headless {
            builder = builder.with_head();
        }
        builder
            .build()
            .map_err(|e| OpsError::Capture(format!("failed to build browser config: {e}")))
    }

    async fn launch(&self) -> Result<(Browser, tokio::task::JoinHandle<()>)> {
        let (browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(cdp("failed to launch Chromium"))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser event error");
                }
            }
        });
        Ok((browser, handler_task))
    }

    async fn drive(
        &self,
        browser: &Browser,
        target: &CaptureTarget,
        slot: &CaptureSlot,
    ) -> Result<AuthHeaders> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(cdp("failed to open page"))?;

        page.execute(
            EnableParams::builder()
                .pattern(RequestPattern::builder().url_pattern("*").build())
                .build(),
        )
        .await
        .map_err(cdp("failed to enable request interception"))?;

        let paused = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(cdp("failed to listen for requests"))?;
        let navigated = page
            .event_listener::<EventFrameNavigated>()
            .await
            .map_err(cdp("failed to listen for navigations"))?;

        let interceptor = tokio::spawn(intercept(
            page.clone(),
            paused,
            target.clone(),
            slot.clone(),
        ));
        let watcher = tokio::spawn(correct_navigation(
            page.clone(),
            navigated,
            target.clone(),
            slot.clone(),
            self.timings.correction,
        ));

        slot.advance(CaptureState::Navigating).await?;
        let entry = target.entry_url();
        output::info(&format!("Navigating to: {entry}"));
        match tokio::time::timeout(self.timings.navigation, page.goto(entry.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "initial navigation did not settle cleanly"),
            Err(_) => output::warning("Page load timed out, but may have captured headers"),
        }

        slot.advance(CaptureState::AwaitingCapture).await?;
        output::info("Waiting for authentication and page load...");
        let headers = slot.wait_for_headers(&self.timings).await;

        interceptor.abort();
        watcher.abort();

        match headers {
            Some(headers) => {
                slot.advance(CaptureState::Captured).await?;
                Ok(headers)
            }
            None => {
                slot.advance(CaptureState::TimedOut).await?;
                Err(OpsError::Capture(
                    "Failed to capture authentication headers. The page may not have loaded \
                     correctly or needs a refresh."
                        .to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl HeaderSource for ChromiumCapture {
    async fn capture(&self, target: &CaptureTarget) -> Result<AuthHeaders> {
        output::info("Opening browser for SSO authentication...");
        output::info("Please complete the authentication process in the browser window.");

        let slot = CaptureSlot::default();
        let (mut browser, handler_task) = self.launch().await?;
        slot.advance(CaptureState::BrowserLaunched).await?;

        let result = self.drive(&browser, target, &slot).await;
        let state = slot.state().await;
        if !state.is_terminal() {
            warn!(%state, "capture stopped before finishing");
        }

        if let Err(e) = browser.close().await {
            debug!(error = %e, "browser close failed");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "browser process wait failed");
        }
        handler_task.abort();

        let headers = result?;
        output::success("Authentication headers captured successfully");
        debug!(count = headers.len(), "captured headers");
        Ok(headers)
    }
}

/// Continue every paused request, swapping staging hosts for production
/// ones and handing the repositories request's headers to `slot`.
async fn intercept(
    page: Page,
    mut events: EventStream<EventRequestPaused>,
    target: CaptureTarget,
    slot: CaptureSlot,
) {
    while let Some(event) = events.next().await {
        let original = event.request.url.as_str();
        let url = rewrite_staging_url(original);
        if url != original {
            debug!(from = %original, to = %url, "redirecting to production");
        }

        let captured = slot
            .observe_request(&url, &target, || {
                AuthHeaders::from_json(event.request.headers.inner())
            })
            .await;
        if captured {
            output::success("Captured authentication headers");
        }

        let mut params = ContinueRequestParams::builder().request_id(event.request_id.clone());
        if url != original {
            params = params.url(url);
        }
        match params.build() {
            Ok(params) => {
                if let Err(e) = page.execute(params).await {
                    debug!(error = %e, "continue request failed");
                }
            }
            Err(e) => debug!(error = %e, "invalid continue request"),
        }
    }
}

/// Send the top-level frame back on course whenever it lands somewhere
/// [`navigation_correction`] knows how to fix.
async fn correct_navigation(
    page: Page,
    mut events: EventStream<EventFrameNavigated>,
    target: CaptureTarget,
    slot: CaptureSlot,
    limit: Duration,
) {
    while let Some(event) = events.next().await {
        if event.frame.parent_id.is_some() {
            continue;
        }
        let current = format!(
            "{}{}",
            event.frame.url,
            event.frame.url_fragment.as_deref().unwrap_or_default()
        );
        let Some(corrected) = navigation_correction(&current, &target) else {
            continue;
        };

        debug!(from = %current, to = %corrected, "frame navigated to wrong endpoint");
        slot.note_correction().await;
        match tokio::time::timeout(limit, page.goto(corrected.as_str())).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => debug!(error = %e, "corrective navigation failed"),
            Err(_) => debug!("corrective navigation timed out"),
        }
    }
}

fn cdp(context: &'static str) -> impl FnOnce(CdpError) -> OpsError {
    move |e| OpsError::Capture(format!("{context}: {e}"))
}
