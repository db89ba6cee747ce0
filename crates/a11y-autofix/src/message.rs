//! The fix-request message sent downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ValidSuggestion;
use crate::select::related_suggestions;

pub const MESSAGE_TYPE: &str = "guidance:accessibility-remediation";

/// One issue the fixer should address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEntry {
    pub issue_name: String,
    pub issue_description: String,
    pub faulty_line: String,
    pub target_selector: String,
    pub suggestion_id: String,
}

impl From<&ValidSuggestion> for IssueEntry {
    fn from(s: &ValidSuggestion) -> Self {
        let issue_description = if s.issue_description.is_empty() {
            format!("Accessibility issue: {}", s.issue_type)
        } else {
            s.issue_description.clone()
        };
        Self {
            issue_name: s.issue_type.clone(),
            issue_description,
            faulty_line: s.faulty_line.clone(),
            target_selector: s.target_selector.clone(),
            suggestion_id: s.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequestData {
    pub url: String,
    pub opportunity_id: String,
    pub aggregation_key: String,
    pub issues_list: Vec<IssueEntry>,
    pub code_bucket: String,
    pub code_path: String,
}

/// Work request for the remediation service. Built once, sent once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub site_id: String,
    pub audit_id: Uuid,
    pub time: DateTime<Utc>,
    pub data: WorkRequestData,
}

/// Where the uploaded source archive lives.
#[derive(Debug, Clone, Copy)]
pub struct CodeLocation<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
}

impl WorkRequest {
    /// Build the request for `selected`. With `send_all`, every suggestion in
    /// `all` sharing its aggregation key is listed, in discovery order.
    pub fn compose(
        site_id: &str,
        selected: &ValidSuggestion,
        all: &[ValidSuggestion],
        send_all: bool,
        code: CodeLocation<'_>,
    ) -> Self {
        let issues_list = if send_all {
            related_suggestions(all, &selected.aggregation_key)
                .into_iter()
                .map(IssueEntry::from)
                .collect()
        } else {
            vec![IssueEntry::from(selected)]
        };

        Self {
            kind: MESSAGE_TYPE.to_string(),
            site_id: site_id.to_string(),
            audit_id: Uuid::new_v4(),
            time: Utc::now(),
            data: WorkRequestData {
                url: selected.url.clone(),
                opportunity_id: selected.opportunity_id.clone(),
                aggregation_key: selected.aggregation_key.clone(),
                issues_list,
                code_bucket: code.bucket.to_string(),
                code_path: code.key.to_string(),
            },
        }
    }

    /// Compact JSON body for the queue.
    pub fn to_body(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Indented JSON for operator review.
    pub fn to_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
