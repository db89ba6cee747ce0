//! Spacecat resources and the analyzed suggestion form used by the workflow.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between the segments of an aggregation key.
pub const AGGREGATION_KEY_DELIMITER: char = '|';

/// Issue type used when an aggregation key has no second segment.
pub const UNKNOWN_ISSUE_TYPE: &str = "unknown";

/// A site registered in Spacecat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    #[serde(rename = "baseURL", default)]
    pub base_url: Option<String>,
}

impl Site {
    /// Base URL for display and matching; empty when the API omits it.
    pub fn url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_default()
    }
}

/// An improvement area detected for a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Opportunity {
    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or_default()
    }

    pub fn is_accessibility(&self) -> bool {
        self.kind().to_lowercase().contains("accessibility")
    }
}

/// A suggestion as returned by the API. `data` is kept loosely typed because
/// producers disagree on camelCase vs snake_case field names, and some send
/// `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl Suggestion {
    /// First string value among `keys`, in order of preference.
    fn data_text(&self, keys: &[&str]) -> String {
        keys.iter()
            .find_map(|k| self.data.get(*k).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string()
    }

    fn aggregation_key(&self) -> Option<&str> {
        self.data
            .get("aggregationKey")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
    }
}

/// A suggestion that carries an aggregation key, flattened for display and
/// message composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidSuggestion {
    pub id: String,
    pub aggregation_key: String,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub url: String,
    pub issue_type: String,
    pub faulty_line: String,
    pub target_selector: String,
    pub issue_description: String,
    pub opportunity_id: String,
    pub opportunity_type: String,
}

/// Second segment of an aggregation key, or `"unknown"`.
///
/// `"a|button-name|c"` yields `"button-name"`.
pub fn extract_issue_type(aggregation_key: &str) -> String {
    aggregation_key
        .split(AGGREGATION_KEY_DELIMITER)
        .nth(1)
        .unwrap_or(UNKNOWN_ISSUE_TYPE)
        .to_string()
}

/// Keep suggestions with a non-empty aggregation key, tagging each with the
/// opportunity it came from. Order is preserved; the rest are dropped.
pub fn analyze_suggestions(
    suggestions: &[Suggestion],
    opportunity_id: &str,
    opportunity_type: &str,
) -> Vec<ValidSuggestion> {
    suggestions
        .iter()
        .filter_map(|s| {
            let key = s.aggregation_key()?;
            Some(ValidSuggestion {
                id: s.id.clone(),
                aggregation_key: key.to_string(),
                kind: s.kind.clone(),
                status: s.status.clone(),
                url: s.data_text(&["url"]),
                issue_type: extract_issue_type(key),
                faulty_line: s.data_text(&["faultyLine", "faulty_line"]),
                target_selector: s.data_text(&["targetSelector", "target_selector"]),
                issue_description: s.data_text(&["issueDescription", "issue_description"]),
                opportunity_id: opportunity_id.to_string(),
                opportunity_type: opportunity_type.to_string(),
            })
        })
        .collect()
}
