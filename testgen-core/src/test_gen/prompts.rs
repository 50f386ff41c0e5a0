//! Prompt construction for test case generation
//!
//! The user prompt is split into XML-tagged sections so the model can tell the
//! ticket apart from our instructions, and it always carries the JSON schema
//! the response parser expects.

use super::{GenerationOptions, Priority, TestCategory};
use crate::ticket::{Ticket, TicketType};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

const SYSTEM_PROMPT: &str = "You are a senior QA engineer who writes manual test cases from issue-tracker tickets. \
Every test case you write is independent, has concrete sequential steps that start with an action verb, \
and ends in an expected result a tester can verify by observation. \
Reply with a JSON array of test case objects and nothing else: no prose, no markdown.";

const BUG_EXAMPLES: &str = r#"Ticket: "Login accepts an empty password" (Bug)
[
  {
    "title": "Reject login when the password field is empty",
    "description": "Reproduces the reported defect and confirms the fix.",
    "preconditions": ["A registered account exists for qa.user@example.com"],
    "steps": [
      "Navigate to the login page",
      "Enter qa.user@example.com in the email field",
      "Leave the password field empty",
      "Click the Sign in button"
    ],
    "expectedResult": "Login is refused and the message 'Password is required' is shown under the password field",
    "priority": "Critical",
    "category": "negative",
    "tags": ["login", "regression", "validation"]
  },
  {
    "title": "Login still succeeds with a valid password after the fix",
    "description": "Guards the happy path around the changed validation.",
    "preconditions": ["A registered account exists for qa.user@example.com"],
    "steps": [
      "Navigate to the login page",
      "Enter valid credentials for qa.user@example.com",
      "Click the Sign in button"
    ],
    "expectedResult": "The dashboard is displayed with the user's name in the header",
    "priority": "High",
    "category": "positive",
    "tags": ["login", "regression"]
  }
]"#;

const ACCEPTANCE_EXAMPLES: &str = r#"Ticket: "Paginate the order history" (Story)
Acceptance criteria:
- Orders are shown 20 per page
- The last page shows the remaining orders
[
  {
    "title": "Order history shows 20 orders on the first page",
    "description": "Covers criterion 1.",
    "preconditions": ["The signed-in customer has 45 orders"],
    "steps": [
      "Open the order history page",
      "Count the orders listed on the first page"
    ],
    "expectedResult": "Exactly 20 orders are listed and a control to reach page 2 is visible",
    "priority": "High",
    "category": "positive",
    "tags": ["pagination", "ui"]
  },
  {
    "title": "Last page lists only the remaining orders",
    "description": "Covers criterion 2.",
    "preconditions": ["The signed-in customer has 45 orders"],
    "steps": [
      "Open the order history page",
      "Navigate to page 3 using the pagination control"
    ],
    "expectedResult": "5 orders are listed and the next-page control is disabled",
    "priority": "Medium",
    "category": "edge_case",
    "tags": ["pagination", "boundary"]
  }
]"#;

const GENERAL_EXAMPLES: &str = r#"Ticket: "Export the report as CSV" (Task)
[
  {
    "title": "Export a populated report as CSV",
    "description": "Happy path for the export button.",
    "preconditions": ["The report contains at least one row"],
    "steps": [
      "Open the monthly report",
      "Click the Export button",
      "Select CSV as the format"
    ],
    "expectedResult": "A CSV file downloads with one line per report row plus a header line",
    "priority": "Medium",
    "category": "positive",
    "tags": ["export", "reports"]
  }
]"#;

/// System and user messages sent to the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Few-shot set chosen for a ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleSet {
    Regression,
    AcceptanceCriteria,
    General,
}

impl ExampleSet {
    pub fn for_ticket(ticket: &Ticket) -> Self {
        match (&ticket.ticket_type, ticket.acceptance_criteria.is_some()) {
            (TicketType::Bug, _) => ExampleSet::Regression,
            (_, true) => ExampleSet::AcceptanceCriteria,
            _ => ExampleSet::General,
        }
    }

    fn text(self) -> &'static str {
        match self {
            ExampleSet::Regression => BUG_EXAMPLES,
            ExampleSet::AcceptanceCriteria => ACCEPTANCE_EXAMPLES,
            ExampleSet::General => GENERAL_EXAMPLES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    min_cases: usize,
    max_cases: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self { min_cases: 8, max_cases: 12 }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&self, ticket: &Ticket, options: &GenerationOptions) -> Prompt {
        let examples = ExampleSet::for_ticket(ticket);
        let mut user = String::new();

        let _ = writeln!(user, "Write test cases for the ticket below.\n");
        user.push_str(&ticket_section(ticket));
        user.push_str(&self.instructions_section(ticket, examples, options));
        let _ = writeln!(user, "<examples>\n{}\n</examples>\n", examples.text());
        user.push_str(&schema_section());
        user.push_str(&self.output_section());

        Prompt { system: SYSTEM_PROMPT.to_string(), user }
    }

    fn instructions_section(&self, ticket: &Ticket, examples: ExampleSet, options: &GenerationOptions) -> String {
        let mut focus: Vec<String> = match examples {
            ExampleSet::Regression => vec![
                "Reproduce the reported defect exactly as described and verify the fix".to_string(),
                "Cover the inputs and states that are one step away from the failing case".to_string(),
                "Include negative cases that prove the wrong behaviour can no longer happen".to_string(),
            ],
            ExampleSet::AcceptanceCriteria => {
                let mut items: Vec<String> = ticket
                    .criteria()
                    .iter()
                    .enumerate()
                    .map(|(i, criterion)| format!("Write at least one test for criterion {}: {}", i + 1, criterion))
                    .collect();
                items.push(
                    "Then add scenarios the criteria do not spell out: invalid input, boundaries, interrupted flows"
                        .to_string(),
                );
                items
            }
            ExampleSet::General => vec![
                "Cover the main success path first".to_string(),
                "Add negative and boundary cases for every input the ticket mentions".to_string(),
                "Note integrations with other features where the ticket implies them".to_string(),
            ],
        };

        if options.include_regression {
            focus.push("Add regression checks for neighbouring behaviour that could break".to_string());
        }
        if options.include_security {
            focus.push("Add security cases: authorization, input validation, injection, session handling".to_string());
        }
        if options.include_performance {
            focus.push("Add performance cases: response time under load, large data sets".to_string());
        }

        let mut section = String::from("<instructions>\n");
        for item in focus {
            let _ = writeln!(section, "- {}", item);
        }
        let _ = writeln!(
            section,
            "- Aim for {}-{} test cases with a mix of categories",
            self.min_cases, self.max_cases
        );
        section.push_str("</instructions>\n\n");
        section
    }

    fn output_section(&self) -> String {
        format!(
            "<output_requirements>\n\
             1. Return between {} and {} test cases as one JSON array\n\
             2. Output the JSON only, without code fences or commentary\n\
             3. Every test case needs a title, at least one step and an expected result\n\
             4. Start each step with an action verb such as Navigate, Click, Enter, Select, Submit or Verify\n\
             5. Do not repeat a scenario with different wording\n\
             </output_requirements>\n",
            self.min_cases, self.max_cases
        )
    }
}

fn ticket_section(ticket: &Ticket) -> String {
    let description = if ticket.description.trim().is_empty() {
        "No description provided."
    } else {
        ticket.description.trim()
    };

    let mut section = String::from("<ticket>\n");
    let _ = writeln!(section, "<key>{}</key>", ticket.key);
    let _ = writeln!(section, "<type>{}</type>", ticket.ticket_type);
    let _ = writeln!(section, "<title>{}</title>", ticket.title.trim());
    let _ = writeln!(section, "<description>\n{}\n</description>", description);
    if let Some(criteria) = &ticket.acceptance_criteria {
        let _ = writeln!(section, "<acceptance_criteria>\n{}\n</acceptance_criteria>", criteria.trim());
    }
    section.push_str("</ticket>\n\n");
    section
}

fn schema_section() -> String {
    let priorities: Vec<&str> = Priority::ALL.iter().map(|p| p.as_str()).collect();
    let categories: Vec<&str> = TestCategory::ALL.iter().map(|c| c.as_str()).collect();

    format!(
        "<json_schema>\n\
         [\n  {{\n\
         \x20   \"title\": string (required, at most 200 characters),\n\
         \x20   \"description\": string,\n\
         \x20   \"preconditions\": string[],\n\
         \x20   \"steps\": string[] (required, at least one),\n\
         \x20   \"expectedResult\": string (required),\n\
         \x20   \"priority\": one of {},\n\
         \x20   \"category\": one of {},\n\
         \x20   \"tags\": string[]\n\
         \x20 }}\n]\n\
         </json_schema>\n\n",
        priorities.join(" | "),
        categories.join(" | ")
    )
}
