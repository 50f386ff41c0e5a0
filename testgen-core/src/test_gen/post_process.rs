//! Normalization, enrichment and de-duplication of validated drafts
//!
//! Every stage is a pure function over its input so the whole pass can be
//! re-run on the same drafts with the same result.

use super::similarity::Deduplicator;
use super::{GeneratedTestCase, Priority, ProcessedDraft, StepFlag, StepIssue, TestCategory};
use crate::config::PipelineConfig;
use crate::ticket::TicketType;
use regex_utils::action_verb;
use std::collections::BTreeSet;
use tracing::debug;

/// Ordered keyword groups; the first group with a hit decides the category.
/// A trailing `*` matches any word with that prefix.
const CATEGORY_KEYWORDS: &[(TestCategory, &[&str])] = &[
    (TestCategory::Negative, &["invalid*", "error*", "fail*", "incorrect", "wrong", "reject*"]),
    (TestCategory::EdgeCase, &["edge*", "boundar*", "limit*", "maximum", "minimum", "empty"]),
    (TestCategory::Security, &["secur*", "auth*", "permission*", "xss", "injection", "csrf"]),
    (TestCategory::Integration, &["integrat*", "api", "apis", "service*", "webhook*", "endpoint*"]),
    (TestCategory::Performance, &["perform*", "load", "stress*", "latency", "throughput"]),
];

const TAG_BUCKETS: &[(&str, &[&str])] = &[
    ("security", &["auth*", "permission*", "password*", "token*", "xss", "injection"]),
    ("api", &["api", "apis", "endpoint*", "rest", "request*"]),
    ("ui", &["page*", "button*", "form", "forms", "modal*", "screen*"]),
    ("database", &["database*", "db", "sql", "query", "queries"]),
    ("authentication", &["login*", "logout*", "auth*", "password*", "session*"]),
    ("authorization", &["permission*", "access*", "role*"]),
    ("performance", &["perform*", "load", "latency", "stress*"]),
];

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn matches_any(words: &[String], patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(stem) => words.iter().any(|word| word.starts_with(stem)),
        None => words.iter().any(|word| word == pattern),
    })
}

/// Case-insensitive priority label, including tracker aliases such as `P0` or `Blocker`
pub fn parse_priority(label: &str) -> Option<Priority> {
    let lowered = label.to_lowercase();
    let first = lowered.split(|c: char| !c.is_alphanumeric()).find(|word| !word.is_empty())?;

    match first {
        "critical" | "blocker" | "highest" | "urgent" => Some(Priority::Critical),
        "high" | "major" => Some(Priority::High),
        "medium" | "normal" | "moderate" => Some(Priority::Medium),
        "low" | "minor" | "trivial" | "lowest" => Some(Priority::Low),
        code => Priority::from_code(code),
    }
}

pub fn default_priority(ticket_type: &TicketType) -> Priority {
    match ticket_type {
        TicketType::Bug => Priority::Critical,
        TicketType::Feature => Priority::High,
        TicketType::Other(_) => Priority::Medium,
    }
}

pub fn normalize_priority(label: Option<&str>, ticket_type: &TicketType) -> Priority {
    label.and_then(parse_priority).unwrap_or_else(|| default_priority(ticket_type))
}

pub fn parse_category(label: &str) -> Option<TestCategory> {
    let normalized = words(label).join(" ");
    match normalized.as_str() {
        "positive" | "happy path" | "happy" | "functional" => Some(TestCategory::Positive),
        "negative" | "error handling" | "error" => Some(TestCategory::Negative),
        "edge case" | "edgecase" | "edge" | "boundary" => Some(TestCategory::EdgeCase),
        "integration" => Some(TestCategory::Integration),
        "security" => Some(TestCategory::Security),
        "performance" | "perf" | "load" => Some(TestCategory::Performance),
        _ => None,
    }
}

/// Category from keywords in the draft text, falling back to `Positive`
pub fn infer_category(title: &str, description: &str, label: Option<&str>) -> TestCategory {
    let text = format!("{} {} {}", title, description, label.unwrap_or_default());
    let words = words(&text);

    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, patterns)| matches_any(&words, patterns))
        .map(|(category, _)| *category)
        .unwrap_or(TestCategory::Positive)
}

pub fn resolve_category(draft: &GeneratedTestCase) -> TestCategory {
    draft
        .category
        .as_deref()
        .and_then(parse_category)
        .unwrap_or_else(|| infer_category(&draft.title, &draft.description, draft.category.as_deref()))
}

pub fn infer_tags(
    ticket_type: &TicketType,
    category: TestCategory,
    draft: &GeneratedTestCase,
) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    tags.insert(ticket_type.tag());
    tags.insert(category.as_str().to_string());
    if *ticket_type == TicketType::Bug {
        tags.insert("regression".to_string());
    }

    let text = format!("{} {} {}", draft.title, draft.description, draft.steps.join(" "));
    let words = words(&text);
    for (tag, patterns) in TAG_BUCKETS {
        if matches_any(&words, patterns) {
            tags.insert((*tag).to_string());
        }
    }

    tags
}

fn clean_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter().map(|tag| tag.trim().to_lowercase()).filter(|tag| !tag.is_empty()).collect()
}

pub fn capitalize_first(text: &str) -> String {
    let text = text.trim();
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|item| item.trim().to_string()).filter(|item| !item.is_empty()).collect()
}

/// Reasons a step is not directly executable; empty when it is
pub fn check_step(step: &str, min_tokens: usize) -> Vec<StepIssue> {
    let mut issues = Vec::new();
    if !action_verb::starts_with_action_verb(step) {
        issues.push(StepIssue::MissingActionVerb);
    }
    let found = step.split_whitespace().count();
    if found < min_tokens {
        issues.push(StepIssue::TooFewTokens { found, minimum: min_tokens });
    }
    issues
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessOutcome {
    pub test_cases: Vec<ProcessedDraft>,
    pub duplicates_removed: usize,
    /// Flagged steps across the surviving test cases
    pub flagged_steps: usize,
}

#[derive(Debug, Clone)]
pub struct PostProcessor {
    min_step_tokens: usize,
    dedup: Deduplicator,
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self { min_step_tokens: 3, dedup: Deduplicator::default() }
    }
}

impl PostProcessor {
    pub fn new(min_step_tokens: usize, dedup: Deduplicator) -> Self {
        Self { min_step_tokens, dedup }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.min_step_tokens, Deduplicator::new(config.dedup_threshold, config.title_weight))
    }

    pub fn process(&self, drafts: Vec<GeneratedTestCase>, ticket_type: &TicketType) -> PostProcessOutcome {
        let processed: Vec<ProcessedDraft> =
            drafts.into_iter().map(|draft| self.process_one(draft, ticket_type)).collect();

        let (test_cases, duplicates_removed) = self.dedup.dedup(processed);
        let flagged_steps = test_cases.iter().map(|case| case.step_flags.len()).sum();

        debug!(
            "Post-processed {} test cases ({} duplicates removed, {} step flags)",
            test_cases.len(),
            duplicates_removed,
            flagged_steps
        );

        PostProcessOutcome { test_cases, duplicates_removed, flagged_steps }
    }

    fn process_one(&self, draft: GeneratedTestCase, ticket_type: &TicketType) -> ProcessedDraft {
        let priority = normalize_priority(draft.priority.as_deref(), ticket_type);
        let category = resolve_category(&draft);
        let mut tags = clean_tags(&draft.tags);
        if tags.is_empty() {
            tags = infer_tags(ticket_type, category, &draft);
        }

        let steps = clean_list(draft.steps);
        let step_flags = steps
            .iter()
            .enumerate()
            .flat_map(|(index, step)| {
                check_step(step, self.min_step_tokens).into_iter().map(move |issue| StepFlag { index, issue })
            })
            .collect();

        ProcessedDraft {
            title: capitalize_first(&draft.title),
            description: capitalize_first(&draft.description),
            preconditions: clean_list(draft.preconditions),
            steps,
            expected_result: capitalize_first(&draft.expected_result),
            priority,
            category,
            tags,
            step_flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, steps: &[&str]) -> GeneratedTestCase {
        GeneratedTestCase {
            title: title.to_string(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
            expected_result: "it works".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_priority_labels_and_aliases() {
        assert_eq!(parse_priority("HIGH"), Some(Priority::High));
        assert_eq!(parse_priority("Critical (P0)"), Some(Priority::Critical));
        assert_eq!(parse_priority("p3"), Some(Priority::Low));
        assert_eq!(parse_priority("Blocker"), Some(Priority::Critical));
        assert_eq!(parse_priority("normal"), Some(Priority::Medium));
        assert_eq!(parse_priority("whenever"), None);
        assert_eq!(parse_priority("p7"), None);
    }

    #[test]
    fn test_priority_codes_follow_ordinal() {
        for priority in Priority::ALL {
            let code = format!("P{}", priority.ordinal());
            assert_eq!(Priority::from_code(&code), Some(priority));
        }
        assert!(Priority::ALL.windows(2).all(|pair| pair[0].ordinal() < pair[1].ordinal()));
        assert_eq!(Priority::High.to_string(), "High (P1)");
        assert_eq!(Priority::from_code("Px"), None);
    }

    #[test]
    fn test_unmatched_priority_defaults_by_ticket_type() {
        assert_eq!(normalize_priority(Some("soon"), &TicketType::Bug), Priority::Critical);
        assert_eq!(normalize_priority(None, &TicketType::Feature), Priority::High);
        assert_eq!(normalize_priority(None, &TicketType::Other("Task".to_string())), Priority::Medium);
        assert_eq!(normalize_priority(Some("low"), &TicketType::Bug), Priority::Low);
    }

    #[test]
    fn test_category_labels_and_inference() {
        assert_eq!(parse_category("Edge-Case"), Some(TestCategory::EdgeCase));
        assert_eq!(parse_category("happy path"), Some(TestCategory::Positive));
        assert_eq!(parse_category("perf"), Some(TestCategory::Performance));
        assert_eq!(parse_category("functional-ish"), None);

        assert_eq!(infer_category("Login fails with invalid password", "", None), TestCategory::Negative);
        assert_eq!(infer_category("Upload at the size limit", "", None), TestCategory::EdgeCase);
        assert_eq!(infer_category("Viewer lacks permission to edit", "", None), TestCategory::Security);
        assert_eq!(infer_category("Orders sync with the billing service", "", None), TestCategory::Integration);
        assert_eq!(infer_category("Search under load", "", None), TestCategory::Performance);
        assert_eq!(infer_category("Download the invoice", "", None), TestCategory::Positive);
    }

    #[test]
    fn test_tag_inference_and_cleanup() {
        let login = draft("Login with a valid password", &["Navigate to the login page", "Click the Sign in button"]);
        let tags = infer_tags(&TicketType::Bug, TestCategory::Positive, &login);
        for tag in ["bug", "positive", "regression", "security", "ui", "authentication"] {
            assert!(tags.contains(tag), "missing {}", tag);
        }
        assert!(!tags.contains("database"));

        let mut tagged = login.clone();
        tagged.tags = vec![" Smoke ".to_string(), "smoke".to_string(), "".to_string()];
        let outcome = PostProcessor::default().process(vec![tagged], &TicketType::Feature);
        assert_eq!(outcome.test_cases[0].tags, BTreeSet::from(["smoke".to_string()]));
    }

    #[test]
    fn test_formatting() {
        let mut raw = draft("  verify the banner ", &[" Open the home page ", "  "]);
        raw.description = "checks the banner".to_string();
        raw.preconditions = vec!["".to_string(), " Banner is configured".to_string()];

        let outcome = PostProcessor::default().process(vec![raw], &TicketType::Feature);
        let case = &outcome.test_cases[0];
        assert_eq!(case.title, "Verify the banner");
        assert_eq!(case.description, "Checks the banner");
        assert_eq!(case.expected_result, "It works");
        assert_eq!(case.steps, vec!["Open the home page"]);
        assert_eq!(case.preconditions, vec!["Banner is configured"]);
        assert_eq!(capitalize_first("élan"), "Élan");
    }

    #[test]
    fn test_step_flags_are_reported_not_dropped() {
        let outcome = PostProcessor::default().process(
            vec![draft("Save a draft", &["Click the Save button", "The draft appears in the list", "Submit"])],
            &TicketType::Feature,
        );

        let case = &outcome.test_cases[0];
        assert_eq!(case.steps.len(), 3);
        assert_eq!(
            case.step_flags,
            vec![
                StepFlag { index: 1, issue: StepIssue::MissingActionVerb },
                StepFlag { index: 2, issue: StepIssue::TooFewTokens { found: 1, minimum: 3 } },
            ]
        );
        assert_eq!(outcome.flagged_steps, 2);
    }

    #[test]
    fn test_duplicates_removed_after_enrichment() {
        let outcome = PostProcessor::default().process(
            vec![
                draft(
                    "Verify login with valid credentials",
                    &["Navigate to the login page", "Enter a valid username and password", "Click the Login button"],
                ),
                draft(
                    "Verify user login with valid creds",
                    &["Navigate to the login page", "Enter valid username and password", "Click Login"],
                ),
            ],
            &TicketType::Bug,
        );

        assert_eq!(outcome.test_cases.len(), 1);
        assert_eq!(outcome.duplicates_removed, 1);
        assert_eq!(outcome.test_cases[0].priority, Priority::Critical);
    }
}
