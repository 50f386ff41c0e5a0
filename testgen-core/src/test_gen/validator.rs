use super::GeneratedTestCase;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ValidationIssue {
    #[error("title is missing")]
    MissingTitle,

    #[error("title is {length} characters, limit is {max}")]
    TitleTooLong { length: usize, max: usize },

    #[error("no steps")]
    NoSteps,

    #[error("step {index} is blank")]
    BlankStep { index: usize },

    #[error("expected result is missing")]
    MissingExpectedResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedDraft {
    pub index: usize,
    pub title: String,
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub accepted: usize,
    pub rejected: Vec<RejectedDraft>,
}

/// Structural checks every draft must pass before post-processing
#[derive(Debug, Clone)]
pub struct Validator {
    max_title_len: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self { max_title_len: 200 }
    }
}

impl Validator {
    pub fn new(max_title_len: usize) -> Self {
        Self { max_title_len }
    }

    pub fn validate(&self, draft: &GeneratedTestCase) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        let title = draft.title.trim();
        let length = title.chars().count();
        if title.is_empty() {
            issues.push(ValidationIssue::MissingTitle);
        } else if length > self.max_title_len {
            issues.push(ValidationIssue::TitleTooLong { length, max: self.max_title_len });
        }

        if draft.steps.is_empty() {
            issues.push(ValidationIssue::NoSteps);
        } else {
            issues.extend(
                draft
                    .steps
                    .iter()
                    .enumerate()
                    .filter(|(_, step)| step.trim().is_empty())
                    .map(|(index, _)| ValidationIssue::BlankStep { index }),
            );
        }

        if draft.expected_result.trim().is_empty() {
            issues.push(ValidationIssue::MissingExpectedResult);
        }

        if issues.is_empty() { Ok(()) } else { Err(issues) }
    }

    pub fn validate_batch(
        &self,
        drafts: Vec<GeneratedTestCase>,
    ) -> (Vec<GeneratedTestCase>, ValidationReport) {
        let mut accepted = Vec::with_capacity(drafts.len());
        let mut report = ValidationReport::default();

        for (index, draft) in drafts.into_iter().enumerate() {
            match self.validate(&draft) {
                Ok(()) => accepted.push(draft),
                Err(issues) => {
                    warn!(
                        "Rejected draft {} ({:?}): {}",
                        index,
                        draft.title,
                        issues.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                    );
                    report.rejected.push(RejectedDraft { index, title: draft.title, issues });
                }
            }
        }

        report.accepted = accepted.len();
        (accepted, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, steps: &[&str], expected: &str) -> GeneratedTestCase {
        GeneratedTestCase {
            title: title.to_string(),
            steps: steps.iter().map(|s| s.to_string()).collect(),
            expected_result: expected.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_draft() {
        let validator = Validator::default();
        assert!(validator.validate(&draft("Login", &["Click Sign in"], "Dashboard")).is_ok());
    }

    #[test]
    fn test_issues_accumulate_in_order() {
        let validator = Validator::default();
        let issues = validator.validate(&draft("  ", &["Open page", " ", ""], "")).unwrap_err();

        assert_eq!(
            issues,
            vec![
                ValidationIssue::MissingTitle,
                ValidationIssue::BlankStep { index: 1 },
                ValidationIssue::BlankStep { index: 2 },
                ValidationIssue::MissingExpectedResult,
            ]
        );
    }

    #[test]
    fn test_title_length_and_missing_steps() {
        let validator = Validator::new(10);
        let issues = validator.validate(&draft("A title longer than ten", &[], "ok")).unwrap_err();

        assert_eq!(
            issues,
            vec![ValidationIssue::TitleTooLong { length: 23, max: 10 }, ValidationIssue::NoSteps]
        );
    }

    #[test]
    fn test_batch_report() {
        let validator = Validator::default();
        let (accepted, report) = validator.validate_batch(vec![
            draft("Good", &["Click Save"], "Saved"),
            draft("No expectation", &["Click Save"], ""),
            draft("Also good", &["Click Cancel"], "Closed"),
        ]);

        assert_eq!(accepted.len(), 2);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].title, "No expectation");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rejected"][0]["issues"][0]["kind"], "missingExpectedResult");
    }
}
