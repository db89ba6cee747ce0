//! Narrowing sites, opportunities and suggestions down to one choice.

use autofix_core::{choose_index, output, OpsError, Prompter, Result};

use crate::model::{Opportunity, Site, ValidSuggestion};

/// Candidates listed before asking the operator to choose.
pub const MAX_DISPLAY: usize = 10;

/// Sites whose base URL contains `fragment`, ignoring case, in API order.
pub fn find_sites_by_name<'a>(sites: &'a [Site], fragment: &str) -> Vec<&'a Site> {
    let needle = fragment.to_lowercase();
    sites
        .iter()
        .filter(|site| site.url().to_lowercase().contains(&needle))
        .collect()
}

/// Resolve a name fragment to one site: a single match is taken as is,
/// several matches are put to the operator.
pub fn select_site(sites: &[Site], fragment: &str, prompter: &mut dyn Prompter) -> Result<Site> {
    let matching = find_sites_by_name(sites, fragment);
    match matching.as_slice() {
        [] => Err(OpsError::NotFound(format!(
            "No sites found matching '{fragment}'"
        ))),
        [only] => {
            output::success(&format!("Found site: {}", display_url(only)));
            output::info(&format!("Site ID: {}", only.id));
            Ok((*only).clone())
        }
        many => {
            output::info(&format!("Found {} matching sites:", many.len()));
            for (i, site) in many.iter().take(MAX_DISPLAY).enumerate() {
                println!("  {}. {} ({})", i + 1, display_url(site), site.id);
            }
            // Numbers past the listed ten are still accepted.
            let index = choose_index(prompter, "\nSelect site number: ", many.len())?;
            Ok(many[index].clone())
        }
    }
}

fn display_url(site: &Site) -> &str {
    match site.url() {
        "" => "N/A",
        url => url,
    }
}

/// Accessibility opportunities, or every opportunity when none is tagged as
/// accessibility. The flag reports whether the fallback was used.
pub fn accessibility_opportunities(opportunities: &[Opportunity]) -> (Vec<Opportunity>, bool) {
    let a11y: Vec<Opportunity> = opportunities
        .iter()
        .filter(|o| o.is_accessibility())
        .cloned()
        .collect();
    if a11y.is_empty() {
        (opportunities.to_vec(), true)
    } else {
        (a11y, false)
    }
}

/// Print the first [`MAX_DISPLAY`] suggestions as a numbered list and return
/// the displayed slice.
pub fn display_suggestions(suggestions: &[ValidSuggestion]) -> &[ValidSuggestion] {
    let displayed = &suggestions[..suggestions.len().min(MAX_DISPLAY)];
    output::subsection(&format!(
        "Found {} valid suggestions (showing {})",
        suggestions.len(),
        displayed.len()
    ));

    for (i, s) in displayed.iter().enumerate() {
        println!("{:2}. Issue: {}", i + 1, s.issue_type);
        println!("    URL: {}", s.url);
        println!("    Suggestion ID: {}", s.id);
        if !s.target_selector.is_empty() {
            println!("    Target: {}...", output::preview(&s.target_selector, 60));
        }
        if !s.faulty_line.is_empty() {
            println!("    Faulty: {}...", output::preview(&s.faulty_line, 60));
        }
        println!();
    }
    displayed
}

/// Let the operator pick one of the displayed suggestions.
pub fn select_suggestion(
    suggestions: &[ValidSuggestion],
    prompter: &mut dyn Prompter,
) -> Result<ValidSuggestion> {
    let displayed = display_suggestions(suggestions);
    let prompt = format!("Select suggestion number (1-{}): ", displayed.len());
    let index = choose_index(prompter, &prompt, displayed.len())?;
    Ok(displayed[index].clone())
}

/// The suggestion with `id`, if present.
pub fn find_suggestion<'a>(
    suggestions: &'a [ValidSuggestion],
    id: &str,
) -> Option<&'a ValidSuggestion> {
    suggestions.iter().find(|s| s.id == id)
}

/// Every suggestion sharing `aggregation_key`, in discovery order.
pub fn related_suggestions<'a>(
    suggestions: &'a [ValidSuggestion],
    aggregation_key: &str,
) -> Vec<&'a ValidSuggestion> {
    suggestions
        .iter()
        .filter(|s| s.aggregation_key == aggregation_key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use autofix_core::ScriptedPrompter;

    fn site(id: &str, url: &str) -> Site {
        Site {
            id: id.to_string(),
            base_url: Some(url.to_string()),
        }
    }

    fn sites() -> Vec<Site> {
        vec![
            site("1", "https://www.SunstarGum.com"),
            site("2", "https://krisshop.com"),
            site("3", "https://sunstargum.co.jp"),
            Site {
                id: "4".into(),
                base_url: None,
            },
        ]
    }

    fn valid(id: &str, key: &str) -> ValidSuggestion {
        ValidSuggestion {
            id: id.to_string(),
            aggregation_key: key.to_string(),
            kind: None,
            status: None,
            url: String::new(),
            issue_type: crate::model::extract_issue_type(key),
            faulty_line: String::new(),
            target_selector: String::new(),
            issue_description: String::new(),
            opportunity_id: "o".into(),
            opportunity_type: "accessibility".into(),
        }
    }

    #[test]
    fn name_match_is_case_insensitive_substring() {
        let sites = sites();
        let ids: Vec<&str> = find_sites_by_name(&sites, "SUNSTAR")
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert!(find_sites_by_name(&sites, "nomatch").is_empty());
    }

    #[test]
    fn single_match_is_auto_selected() {
        let mut prompter = ScriptedPrompter::default();
        let chosen = select_site(&sites(), "kris", &mut prompter).unwrap();
        assert_eq!(chosen.id, "2");
        assert!(prompter.prompts().is_empty());
    }

    #[test]
    fn multiple_matches_prompt_for_a_number() {
        let mut prompter = ScriptedPrompter::new(["2"]);
        let chosen = select_site(&sites(), "sunstargum", &mut prompter).unwrap();
        assert_eq!(chosen.id, "3");
    }

    #[test]
    fn zero_matches_and_bad_choice_are_errors() {
        let mut prompter = ScriptedPrompter::new(["9"]);
        assert!(matches!(
            select_site(&sites(), "absent", &mut prompter),
            Err(OpsError::NotFound(_))
        ));
        assert!(matches!(
            select_site(&sites(), "sunstargum", &mut prompter),
            Err(OpsError::Selection(_))
        ));
    }

    #[test]
    fn direct_numeric_input_beyond_listing() {
        let many: Vec<Site> = (1..=12)
            .map(|i| site(&i.to_string(), &format!("https://shop{i}.example.com")))
            .collect();
        let mut prompter = ScriptedPrompter::new(["12"]);
        let chosen = select_site(&many, "example", &mut prompter).unwrap();
        assert_eq!(chosen.id, "12");
    }

    #[test]
    fn opportunity_fallback_uses_everything() {
        let opps = vec![
            Opportunity {
                id: "a".into(),
                kind: Some("broken-backlinks".into()),
            },
            Opportunity {
                id: "b".into(),
                kind: Some("cwv".into()),
            },
        ];
        let (kept, fallback) = accessibility_opportunities(&opps);
        assert!(fallback);
        assert_eq!(kept.len(), 2);

        let mut with_a11y = opps.clone();
        with_a11y.push(Opportunity {
            id: "c".into(),
            kind: Some("a11y-accessibility".into()),
        });
        let (kept, fallback) = accessibility_opportunities(&with_a11y);
        assert!(!fallback);
        assert_eq!(kept[0].id, "c");
    }

    #[test]
    fn suggestion_choice_is_bounded_to_displayed() {
        let list: Vec<ValidSuggestion> = (0..15)
            .map(|i| valid(&format!("s{i}"), "img|alt-text|x"))
            .collect();
        let mut prompter = ScriptedPrompter::new(["11"]);
        assert!(select_suggestion(&list, &mut prompter).is_err());

        let mut prompter = ScriptedPrompter::new(["10"]);
        assert_eq!(select_suggestion(&list, &mut prompter).unwrap().id, "s9");
        assert_eq!(prompter.prompts(), ["Select suggestion number (1-10): "]);
    }

    #[test]
    fn related_keeps_discovery_order() {
        let list = vec![
            valid("a", "img|alt-text|x"),
            valid("b", "btn|button-name|y"),
            valid("c", "img|alt-text|x"),
        ];
        let ids: Vec<&str> = related_suggestions(&list, "img|alt-text|x")
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(find_suggestion(&list, "b").unwrap().issue_type, "button-name");
        assert!(find_suggestion(&list, "zzz").is_none());
    }
}
