//! Jira Cloud ticket source using the REST v3 issue endpoint
//!
//! Authenticates with basic auth (account email + API token), both read from
//! the environment variables named in [`TicketSourceConfig`].

use super::{Ticket, TicketKey, TicketRecord, TicketSource, TicketSourceError};
use crate::config::TicketSourceConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct JiraTicketSource {
    client: Client,
    base_url: String,
    email: String,
    api_token: String,
    acceptance_criteria_field: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JiraIssue {
    key: String,
    fields: JiraFields,
}

#[derive(Debug, Deserialize)]
struct JiraFields {
    summary: String,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    issuetype: Option<JiraIssueType>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct JiraIssueType {
    name: String,
}

impl JiraTicketSource {
    pub fn new(
        base_url: impl Into<String>,
        email: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TicketSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TicketSourceError::unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email: email.into(),
            api_token: api_token.into(),
            acceptance_criteria_field: None,
        })
    }

    /// Build from configuration, failing fast when credentials are absent
    pub fn from_config(config: &TicketSourceConfig) -> Result<Self, TicketSourceError> {
        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| TicketSourceError::config_missing("tickets.base_url"))?;
        let email = std::env::var(&config.email_env)
            .map_err(|_| TicketSourceError::config_missing(&config.email_env))?;
        let api_token = std::env::var(&config.token_env)
            .map_err(|_| TicketSourceError::config_missing(&config.token_env))?;

        let mut source =
            Self::new(base_url, email, api_token, Duration::from_secs(config.timeout_secs))?;
        source.acceptance_criteria_field = config.acceptance_criteria_field.clone();
        Ok(source)
    }

    fn to_ticket(&self, issue: JiraIssue) -> Ticket {
        let mut fields = issue.fields;
        let acceptance_criteria = self
            .acceptance_criteria_field
            .as_ref()
            .and_then(|field| fields.extra.remove(field))
            .filter(|value| !value.is_null());

        TicketRecord {
            key: issue.key,
            ticket_type: fields.issuetype.map(|t| t.name),
            title: fields.summary,
            description: fields.description,
            acceptance_criteria,
        }
        .into_ticket()
    }
}

#[async_trait]
impl TicketSource for JiraTicketSource {
    fn name(&self) -> &str {
        "jira"
    }

    async fn get_ticket_by_key(&self, key: &TicketKey) -> Result<Ticket, TicketSourceError> {
        let url = format!("{}/rest/api/3/issue/{}", self.base_url, key);
        let mut fields = vec!["summary", "description", "issuetype"];
        if let Some(field) = &self.acceptance_criteria_field {
            fields.push(field.as_str());
        }

        debug!("Fetching ticket {} from Jira", key);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_token))
            .query(&[("fields", fields.join(","))])
            .send()
            .await
            .map_err(|e| TicketSourceError::unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => TicketSourceError::not_found(key),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    TicketSourceError::Unauthorized { status: status.as_u16() }
                }
                _ => {
                    warn!("Jira returned {} for {}: {}", status, key, body);
                    TicketSourceError::unavailable(format!("Jira API error: {} - {}", status, body))
                }
            });
        }

        let issue: JiraIssue = response
            .json()
            .await
            .map_err(|e| TicketSourceError::malformed(e.to_string()))?;

        info!("Fetched ticket {} from Jira", issue.key);
        Ok(self.to_ticket(issue))
    }
}
