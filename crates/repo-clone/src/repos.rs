//! SSG repository listing and clone commands.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use autofix_core::{output, ApiClient, OpsError, Result, SRE_ROLE_HINT};

use crate::capture::AuthHeaders;

/// Items per page served by the repositories endpoint.
pub const PAGE_SIZE: usize = 20;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A repository candidate as listed by SSG.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "repositoryUrl", default)]
    pub repository_url: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct RepositoryPage {
    #[serde(rename = "_embedded", default)]
    embedded: Embedded,
    #[serde(rename = "_links", default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Embedded {
    #[serde(default)]
    repositories: Vec<Repository>,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
struct Commands {
    clone: Option<String>,
}

/// SSG client authenticated with captured browser headers.
pub struct SsgClient {
    api: ApiClient,
    base: Url,
}

impl SsgClient {
    pub fn new(base: &str, headers: &AuthHeaders) -> Result<Self> {
        let mut base = Url::parse(base)
            .map_err(|e| OpsError::InvalidConfig(format!("invalid SSG API base '{base}': {e}")))?;
        // Endpoint paths are joined below any path prefix the base carries.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let api = ApiClient::new(headers.iter())?.with_auth_hint(SRE_ROLE_HINT);
        debug!(headers = api.header_count(), "SSG client ready");
        Ok(Self { api, base })
    }

    /// Every repository of `program_id`, following HAL `next` links until a
    /// short page, a missing link, or a link already visited.
    pub async fn fetch_repositories(&self, program_id: &str) -> Result<Vec<Repository>> {
        let mut next = Some(self.endpoint(&format!("api/program/{program_id}/repositories"))?);
        let mut visited = HashSet::new();
        let mut all = Vec::new();

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                warn!(%url, "pagination loop detected");
                break;
            }
            output::info(&format!("Fetching: {url}"));
            let page: RepositoryPage = self.api.get_json(url.as_str(), REQUEST_TIMEOUT).await?;
            let count = page.embedded.repositories.len();
            all.extend(page.embedded.repositories);
            debug!(count, total = all.len(), "repository page");

            if count < PAGE_SIZE {
                break;
            }
            next = match page.links.next {
                Some(link) => Some(self.resolve(&link.href)?),
                None => None,
            };
        }

        output::success(&format!("Total repositories found: {}", all.len()));
        Ok(all)
    }

    /// The shell command that clones `repository_id`.
    pub async fn fetch_clone_command(
        &self,
        program_id: &str,
        repository_id: &str,
    ) -> Result<String> {
        let url = self.endpoint(&format!(
            "api/program/{program_id}/repository/{repository_id}/commands"
        ))?;
        output::info(&format!("Fetching clone command from: {url}"));
        let commands: Commands = self.api.get_json(url.as_str(), REQUEST_TIMEOUT).await?;
        commands
            .clone
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| OpsError::NotFound("Clone command not found in response".to_string()))
    }

    /// `path` below the API base.
    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| OpsError::InvalidConfig(format!("invalid endpoint '{path}': {e}")))
    }

    /// HAL links as served: absolute URLs pass through, others resolve
    /// against the base.
    fn resolve(&self, link: &str) -> Result<Url> {
        self.base
            .join(link)
            .map_err(|e| OpsError::InvalidConfig(format!("invalid link '{link}': {e}")))
    }
}
