//! Spacecat catalog reads: sites, opportunities, suggestions.
//!
//! Each listing degrades to an empty collection on transport, status or
//! decoding failures; the workflow decides whether emptiness is fatal.
//! Rejected credentials (401/403) always propagate.

use std::time::Duration;

use autofix_core::{join_url, output, ApiClient, OpsError, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::AutofixConfig;
use crate::model::{Opportunity, Site, Suggestion};

const SITES_TIMEOUT: Duration = Duration::from_secs(60);
const LISTING_TIMEOUT: Duration = Duration::from_secs(30);

const AUTH_HINT: &str = "Check SPACECAT_API_KEY and SPACECAT_IMS_ORG_ID in your .env file";

/// Read-only client for the Spacecat API.
pub struct SpacecatClient {
    api: ApiClient,
    base: String,
}

impl SpacecatClient {
    pub fn new(config: &AutofixConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config.api_headers())?.with_auth_hint(AUTH_HINT),
            base: config.api_base.clone(),
        })
    }

    /// Every site visible to the configured organization.
    pub async fn fetch_sites(&self) -> Result<Vec<Site>> {
        let url = join_url(&self.base, "/sites");
        self.list(&url, SITES_TIMEOUT).await.or_else(|e| {
            degrade(e, |msg| output::error(&format!("Failed to fetch sites: {msg}")))
        })
    }

    pub async fn fetch_opportunities(&self, site_id: &str) -> Result<Vec<Opportunity>> {
        let url = join_url(&self.base, &format!("/sites/{site_id}/opportunities"));
        self.list(&url, LISTING_TIMEOUT).await.or_else(|e| {
            degrade(e, |msg| {
                output::warning(&format!("Failed to fetch opportunities: {msg}"))
            })
        })
    }

    pub async fn fetch_suggestions(
        &self,
        site_id: &str,
        opportunity_id: &str,
    ) -> Result<Vec<Suggestion>> {
        let url = join_url(
            &self.base,
            &format!("/sites/{site_id}/opportunities/{opportunity_id}/suggestions"),
        );
        self.list(&url, LISTING_TIMEOUT).await.or_else(|e| {
            degrade(e, |msg| {
                debug!(opportunity_id, error = %msg, "suggestion listing failed")
            })
        })
    }

    async fn list<T: DeserializeOwned>(&self, url: &str, timeout: Duration) -> Result<Vec<T>> {
        let items: Vec<T> = self.api.get_json(url, timeout).await?;
        debug!(%url, count = items.len(), "listed");
        Ok(items)
    }
}

/// Turn a failed listing into an empty one, unless credentials were rejected.
fn degrade<T>(err: OpsError, report: impl FnOnce(&str)) -> Result<Vec<T>> {
    match err {
        OpsError::Unauthorized { .. } => Err(err),
        other => {
            warn!(error = %other, "listing degraded to empty");
            report(&other.to_string());
            Ok(Vec::new())
        }
    }
}
