//! Test case generation from issue-tracker tickets
//!
//! Drafts flow through the parser, validator and post-processor before they
//! become persisted [`TestCase`] records.

pub mod parser;
pub mod post_process;
pub mod prompts;
pub mod similarity;
pub mod validator;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

pub use parser::{ParseError, ParseOutcome, ResponseParser};
pub use post_process::{PostProcessOutcome, PostProcessor};
pub use prompts::{Prompt, PromptBuilder};
pub use validator::{ValidationIssue, ValidationReport, Validator};

use crate::ticket::TicketKey;

/// Option flags for a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    pub include_regression: bool,
    pub include_security: bool,
    pub include_performance: bool,
    pub force: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            include_regression: true,
            include_security: false,
            include_performance: false,
            force: false,
        }
    }
}

/// Priority of a test case, ordered from most to least urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Critical, Priority::High, Priority::Medium, Priority::Low];

    /// Numeric level, 0 for Critical through 3 for Low
    pub fn ordinal(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    /// Level for a tracker-style code such as `P0` or `p2`
    pub fn from_code(code: &str) -> Option<Self> {
        let level = code.strip_prefix(['P', 'p'])?.parse::<u8>().ok()?;
        Self::ALL.into_iter().find(|priority| priority.ordinal() == level)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (P{})", self.as_str(), self.ordinal())
    }
}

/// Kind of scenario a test case covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TestCategory {
    Positive,
    Negative,
    EdgeCase,
    Integration,
    Security,
    Performance,
}

impl TestCategory {
    pub const ALL: [TestCategory; 6] = [
        TestCategory::Positive,
        TestCategory::Negative,
        TestCategory::EdgeCase,
        TestCategory::Integration,
        TestCategory::Security,
        TestCategory::Performance,
    ];

    /// Snake-case name used in prompts and tags
    pub fn as_str(self) -> &'static str {
        match self {
            TestCategory::Positive => "positive",
            TestCategory::Negative => "negative",
            TestCategory::EdgeCase => "edge_case",
            TestCategory::Integration => "integration",
            TestCategory::Security => "security",
            TestCategory::Performance => "performance",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TestCaseStatus {
    #[default]
    Draft,
    Active,
    Archived,
    Deprecated,
}

/// Quality problem found on a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StepIssue {
    MissingActionVerb,
    TooFewTokens { found: usize, minimum: usize },
}

impl fmt::Display for StepIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepIssue::MissingActionVerb => f.write_str("does not start with an action verb"),
            StepIssue::TooFewTokens { found, minimum } => {
                write!(f, "has {} words, expected at least {}", found, minimum)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepFlag {
    pub index: usize,
    pub issue: StepIssue,
}

/// Unvalidated candidate produced by parsing a provider response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTestCase {
    pub title: String,
    pub description: String,
    pub preconditions: Vec<String>,
    pub steps: Vec<String>,
    pub expected_result: String,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

/// Draft that passed validation and post-processing
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDraft {
    pub title: String,
    pub description: String,
    pub preconditions: Vec<String>,
    pub steps: Vec<String>,
    pub expected_result: String,
    pub priority: Priority,
    pub category: TestCategory,
    pub tags: BTreeSet<String>,
    pub step_flags: Vec<StepFlag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub count: u32,
    pub success_rate: f32,
}

/// Persisted test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub ticket_key: TicketKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub preconditions: Vec<String>,
    pub steps: Vec<String>,
    pub expected_result: String,
    pub priority: Priority,
    #[serde(alias = "testType")]
    pub category: TestCategory,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub status: TestCaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub step_warnings: Vec<StepFlag>,
}

impl TestCase {
    /// Assign identity and timestamps to a processed draft
    pub fn from_processed(draft: ProcessedDraft, ticket_key: &TicketKey) -> Self {
        let now = Utc::now();
        Self {
            id: format!("generated-{}", Uuid::new_v4()),
            ticket_key: ticket_key.clone(),
            component: ticket_key.component(),
            title: draft.title,
            description: draft.description,
            preconditions: draft.preconditions,
            steps: draft.steps,
            expected_result: draft.expected_result,
            priority: draft.priority,
            category: draft.category,
            tags: draft.tags,
            status: TestCaseStatus::Draft,
            created_at: now,
            updated_at: now,
            execution: None,
            step_warnings: draft.step_flags,
        }
    }
}
