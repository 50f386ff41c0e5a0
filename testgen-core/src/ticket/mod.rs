//! Issue-tracker tickets and the sources that supply them

pub mod file;
pub mod jira;
pub mod rich_text;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

pub use file::FileTicketSource;
pub use jira::JiraTicketSource;

use crate::config::{TicketSourceConfig, TicketSourceKind};

/// Tracker key such as `PROJ-123`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketKey(String);

impl TicketKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased project prefix, `PROJ-123` -> `proj`
    pub fn component(&self) -> Option<String> {
        regex_utils::ticket_key::project(&self.0).map(|project| project.to_lowercase())
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TicketKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for TicketKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TicketType {
    Bug,
    Feature,
    Other(String),
}

impl TicketType {
    /// Map a tracker issue-type name onto the known kinds
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "bug" | "defect" => TicketType::Bug,
            "story" | "user story" | "feature" | "enhancement" => TicketType::Feature,
            _ => TicketType::Other(name.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TicketType::Bug => "Bug",
            TicketType::Feature => "Feature",
            TicketType::Other(name) => name,
        }
    }

    /// Tag form of the type name
    pub fn tag(&self) -> String {
        self.as_str().trim().to_lowercase().replace(char::is_whitespace, "-")
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TicketType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TicketType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(TicketType::parse(&name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub key: TicketKey,
    pub ticket_type: TicketType,
    pub title: String,
    /// Plain-text description, already flattened from rich text
    pub description: String,
    pub acceptance_criteria: Option<String>,
}

impl Ticket {
    pub fn new(key: impl Into<TicketKey>, ticket_type: TicketType, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ticket_type,
            title: title.into(),
            description: String::new(),
            acceptance_criteria: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_acceptance_criteria(mut self, criteria: impl Into<String>) -> Self {
        let criteria = criteria.into();
        self.acceptance_criteria = (!criteria.trim().is_empty()).then_some(criteria);
        self
    }

    /// Acceptance criteria split into one entry per line, bullets removed
    pub fn criteria(&self) -> Vec<&str> {
        self.acceptance_criteria
            .as_deref()
            .map(|text| {
                text.lines()
                    .map(regex_utils::list_item::strip_marker)
                    .filter(|line| !line.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Ticket as stored by trackers and ticket files, before normalization
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    pub key: String,
    #[serde(alias = "type", alias = "issueType", default)]
    pub ticket_type: Option<String>,
    #[serde(alias = "summary")]
    pub title: String,
    #[serde(default)]
    pub description: Option<serde_json::Value>,
    #[serde(default, alias = "acceptance_criteria")]
    pub acceptance_criteria: Option<serde_json::Value>,
}

impl TicketRecord {
    pub fn into_ticket(self) -> Ticket {
        let description =
            self.description.as_ref().map(rich_text::flatten).unwrap_or_default();
        let criteria = self
            .acceptance_criteria
            .as_ref()
            .map(rich_text::flatten)
            .filter(|text| !text.trim().is_empty())
            .or_else(|| rich_text::extract_acceptance_criteria(&description));
        let ticket_type = TicketType::parse(self.ticket_type.as_deref().unwrap_or("Task"));

        let ticket = Ticket::new(self.key, ticket_type, self.title.trim()).with_description(description);
        match criteria {
            Some(criteria) => ticket.with_acceptance_criteria(criteria),
            None => ticket,
        }
    }
}

#[derive(Debug, Error)]
pub enum TicketSourceError {
    #[error("Ticket {key} not found")]
    NotFound { key: TicketKey },

    #[error("Ticket source is not configured: environment variable {variable} is not set")]
    ConfigMissing { variable: String },

    #[error("Ticket source rejected the credentials (status {status})")]
    Unauthorized { status: u16 },

    #[error("Ticket source unavailable: {message}")]
    Unavailable { message: String },

    #[error("Malformed ticket data: {message}")]
    Malformed { message: String },
}

impl TicketSourceError {
    pub fn not_found(key: &TicketKey) -> Self {
        Self::NotFound { key: key.clone() }
    }

    pub fn config_missing(variable: impl Into<String>) -> Self {
        Self::ConfigMissing { variable: variable.into() }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed { message: message.into() }
    }
}

/// Read-only access to tickets by key
#[async_trait]
pub trait TicketSource: Send + Sync {
    fn name(&self) -> &str;

    async fn get_ticket_by_key(&self, key: &TicketKey) -> Result<Ticket, TicketSourceError>;
}

/// Build the configured ticket source
pub fn from_config(config: &TicketSourceConfig) -> Result<Arc<dyn TicketSource>, TicketSourceError> {
    Ok(match config.source {
        TicketSourceKind::Jira => Arc::new(JiraTicketSource::from_config(config)?),
        TicketSourceKind::File => Arc::new(FileTicketSource::new(&config.dir)),
    })
}

/// Ticket source backed by a map, used by tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryTicketSource {
    tickets: RwLock<HashMap<TicketKey, Ticket>>,
}

impl InMemoryTicketSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tickets(tickets: impl IntoIterator<Item = Ticket>) -> Self {
        let tickets = tickets.into_iter().map(|ticket| (ticket.key.clone(), ticket)).collect();
        Self { tickets: RwLock::new(tickets) }
    }

    pub async fn insert(&self, ticket: Ticket) {
        self.tickets.write().await.insert(ticket.key.clone(), ticket);
    }
}

#[async_trait]
impl TicketSource for InMemoryTicketSource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get_ticket_by_key(&self, key: &TicketKey) -> Result<Ticket, TicketSourceError> {
        self.tickets
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| TicketSourceError::not_found(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticket_type_parsing() {
        assert_eq!(TicketType::parse("Bug"), TicketType::Bug);
        assert_eq!(TicketType::parse("defect"), TicketType::Bug);
        assert_eq!(TicketType::parse("Story"), TicketType::Feature);
        assert_eq!(TicketType::parse(" enhancement "), TicketType::Feature);
        assert_eq!(TicketType::parse("Spike"), TicketType::Other("Spike".to_string()));
        assert_eq!(TicketType::parse("Tech Debt").tag(), "tech-debt");
    }

    #[test]
    fn test_ticket_key_component() {
        assert_eq!(TicketKey::new("PROJ-123").component(), Some("proj".to_string()));
        assert_eq!(TicketKey::new(" QA_TEAM-7 ").as_str(), "QA_TEAM-7");
        assert_eq!(TicketKey::new("standalone").component(), None);
    }

    #[test]
    fn test_record_with_rich_text_description() {
        let record: TicketRecord = serde_json::from_value(json!({
            "key": "PAY-9",
            "issueType": "Story",
            "summary": "Saved cards at checkout",
            "description": {
                "type": "doc",
                "content": [
                    {"type": "paragraph", "content": [{"type": "text", "text": "Let users pay with a saved card."}]},
                    {"type": "heading", "content": [{"type": "text", "text": "Acceptance Criteria"}]},
                    {"type": "bulletList", "content": [
                        {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "Saved cards are listed"}]}]},
                        {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "Expired cards cannot be selected"}]}]}
                    ]}
                ]
            }
        }))
        .unwrap();

        let ticket = record.into_ticket();
        assert_eq!(ticket.ticket_type, TicketType::Feature);
        assert!(ticket.description.starts_with("Let users pay with a saved card."));
        assert_eq!(ticket.criteria(), vec!["Saved cards are listed", "Expired cards cannot be selected"]);
    }

    #[tokio::test]
    async fn test_in_memory_source() {
        let source = InMemoryTicketSource::with_tickets([Ticket::new(
            "AUTH-1",
            TicketType::Bug,
            "Login fails with empty password",
        )]);

        let ticket = source.get_ticket_by_key(&TicketKey::new("AUTH-1")).await.unwrap();
        assert_eq!(ticket.title, "Login fails with empty password");

        let missing = source.get_ticket_by_key(&TicketKey::new("AUTH-2")).await;
        assert!(matches!(missing, Err(TicketSourceError::NotFound { .. })));
    }
}
