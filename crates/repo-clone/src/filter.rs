//! Picking the customer's main repository out of a program's candidates.
//!
//! Candidates whose name contains a denylisted keyword, or whose status is
//! not `ready`, never match. The rest are tried against the program pattern
//! `<customer>-p<program>[-uk<n>]` first and the generic
//! `<customer>-aem-cloud` pattern second; the first match in listing order
//! wins.

use regex::Regex;

use autofix_core::{output, OpsError, Result};

use crate::repos::Repository;

/// Lowercased name fragments that mark a non-primary repository.
pub const EXCLUDED_KEYWORDS: [&str; 5] = ["config", "dispatcher", "qa", "stage", "dev"];

pub const READY_STATUS: &str = "ready";

const FALLBACK_PATTERN: &str = r"^[^-]+-aem-cloud$";

/// Which rule selected the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    OnlyCandidate,
    Primary,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct RepoMatch<'a> {
    pub repository: &'a Repository,
    pub rule: MatchRule,
    /// Every primary-pattern match, in listing order.
    pub primary_matches: Vec<&'a Repository>,
}

/// Whether `repo` is ruled out before any pattern is tried.
pub fn is_excluded(repo: &Repository) -> bool {
    if repo.status != READY_STATUS {
        return true;
    }
    let name = repo.repo.to_lowercase();
    EXCLUDED_KEYWORDS.iter().any(|k| name.contains(k))
}

/// `^[^-]+-p<program_id>(-uk\d+)?$`
pub fn primary_pattern(program_id: &str) -> Result<Regex> {
    Regex::new(&format!(
        r"^[^-]+-p{}(-uk\d+)?$",
        regex::escape(program_id)
    ))
    .map_err(|e| OpsError::InvalidConfig(format!("bad program id '{program_id}': {e}")))
}

/// Choose one repository for `program_id`, or fail listing every candidate.
pub fn filter_repositories<'a>(
    repositories: &'a [Repository],
    program_id: &str,
) -> Result<RepoMatch<'a>> {
    if repositories.is_empty() {
        return Err(OpsError::NotFound(
            "No repositories found for this program".to_string(),
        ));
    }

    let eligible: Vec<&Repository> = repositories.iter().filter(|r| !is_excluded(r)).collect();

    if let [only] = repositories {
        if eligible.len() == 1 {
            output::info("Only one repository found, selecting it");
            return Ok(RepoMatch {
                repository: only,
                rule: MatchRule::OnlyCandidate,
                primary_matches: Vec::new(),
            });
        }
    }

    output::info(&format!("Filtering {} repositories...", repositories.len()));
    let primary = primary_pattern(program_id)?;
    let primary_matches: Vec<&Repository> = eligible
        .iter()
        .copied()
        .filter(|r| primary.is_match(&r.repo))
        .collect();

    if let Some(first) = primary_matches.first().copied() {
        if primary_matches.len() > 1 {
            output::warning(&format!(
                "Multiple matching repositories found ({}), using first:",
                primary_matches.len()
            ));
            for r in &primary_matches {
                println!("    - {}", r.repo);
            }
        }
        output::success(&format!("Selected repository: {}", first.repo));
        return Ok(RepoMatch {
            repository: first,
            rule: MatchRule::Primary,
            primary_matches,
        });
    }

    output::warning("No repositories matched primary pattern, trying fallback pattern...");
    let fallback = Regex::new(FALLBACK_PATTERN)
        .map_err(|e| OpsError::InvalidConfig(format!("fallback pattern: {e}")))?;
    if let Some(found) = eligible.iter().copied().find(|r| fallback.is_match(&r.repo)) {
        output::success(&format!("Selected repository (fallback): {}", found.repo));
        return Ok(RepoMatch {
            repository: found,
            rule: MatchRule::Fallback,
            primary_matches: Vec::new(),
        });
    }

    output::error("No suitable repositories found after filtering");
    output::info("Available repositories:");
    for r in repositories {
        println!("  - {} (status: {})", r.repo, r.status);
    }
    Err(OpsError::NotFound(
        "No suitable repositories found after filtering".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str, status: &str) -> Repository {
        Repository {
            id: format!("id-{name}"),
            repo: name.to_string(),
            status: status.to_string(),
            repository_url: None,
        }
    }

    #[test]
    fn config_sibling_is_skipped() {
        let repos = vec![repo("acme-p42155", "ready"), repo("acme-p42155-config", "ready")];
        let m = filter_repositories(&repos, "42155").unwrap();
        assert_eq!(m.repository.repo, "acme-p42155");
        assert_eq!(m.rule, MatchRule::Primary);
        assert_eq!(m.primary_matches.len(), 1);
    }

    #[test]
    fn first_primary_match_wins_in_listing_order() {
        let repos = vec![
            repo("other-p1", "ready"),
            repo("acme-p42155-uk7", "ready"),
            repo("acme-p42155", "ready"),
        ];
        let m = filter_repositories(&repos, "42155").unwrap();
        assert_eq!(m.repository.repo, "acme-p42155-uk7");
        assert_eq!(m.primary_matches.len(), 2);
    }

    #[test]
    fn primary_pattern_is_anchored() {
        let re = primary_pattern("42155").unwrap();
        assert!(re.is_match("acme-p42155"));
        assert!(re.is_match("acme-p42155-uk12"));
        assert!(!re.is_match("acme-p421550"));
        assert!(!re.is_match("acme-p42155-uk"));
        assert!(!re.is_match("my-acme-p42155"));
    }

    #[test]
    fn denylist_applies_to_fallback_too() {
        let repos = vec![
            repo("acme-p42155", "creating"),
            repo("qa-aem-cloud", "ready"),
            repo("acme-aem-cloud", "ready"),
        ];
        let m = filter_repositories(&repos, "42155").unwrap();
        assert_eq!(m.repository.repo, "acme-aem-cloud");
        assert_eq!(m.rule, MatchRule::Fallback);
    }

    #[test]
    fn keyword_match_ignores_case() {
        assert!(is_excluded(&repo("acme-Dispatcher-p1", "ready")));
        assert!(is_excluded(&repo("acme-p1", "failed")));
        assert!(!is_excluded(&repo("acme-p1", "ready")));
    }

    #[test]
    fn single_candidate_must_pass_exclusions() {
        let only = vec![repo("whatever-name", "ready")];
        let m = filter_repositories(&only, "42155").unwrap();
        assert_eq!(m.rule, MatchRule::OnlyCandidate);

        let excluded = vec![repo("acme-p42155-dev", "ready")];
        assert!(matches!(
            filter_repositories(&excluded, "42155"),
            Err(OpsError::NotFound(_))
        ));
    }

    #[test]
    fn empty_and_unmatched_lists_fail() {
        assert!(filter_repositories(&[], "1").is_err());
        let repos = vec![repo("acme-stage", "ready"), repo("random", "ready")];
        assert!(matches!(
            filter_repositories(&repos, "42155"),
            Err(OpsError::NotFound(m)) if m.contains("after filtering")
        ));
    }
}
