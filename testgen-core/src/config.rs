//! Configuration for providers, ticket sources, storage and the pipeline
//!
//! Loaded from a TOML file; every section falls back to its defaults so a
//! partial file is valid. Secrets are never stored here, only the names of
//! the environment variables that hold them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestgenConfig {
    pub provider: ProviderConfig,
    pub retry: RetryConfig,
    pub pipeline: PipelineConfig,
    pub tickets: TicketSourceConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

impl TestgenConfig {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path)
                .with_context(|| format!("Loading configuration from {}", path.display())),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }
}

/// OpenAI-compatible chat completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub auth_header: String,
    /// Prepended to the key with a space; empty sends the bare key
    pub auth_prefix: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            auth_header: "Authorization".to_string(),
            auth_prefix: "Bearer".to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, initial_delay_ms: 1000, backoff_multiplier: 2.0, max_delay_ms: 30_000 }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Quality gates applied to generated drafts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Batches smaller than this are reported as low-yield
    pub min_yield: usize,
    pub max_title_len: usize,
    pub min_step_tokens: usize,
    pub dedup_threshold: f64,
    /// Share of the title ratio in the combined similarity; steps get the rest
    pub title_weight: f64,
    /// Regenerations allowed when a response cannot be parsed
    pub parse_retries: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_yield: 8,
            max_title_len: 200,
            min_step_tokens: 3,
            dedup_threshold: 0.70,
            title_weight: 0.5,
            parse_retries: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TicketSourceKind {
    #[default]
    Jira,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketSourceConfig {
    pub source: TicketSourceKind,
    /// Jira site, e.g. `https://company.atlassian.net`
    pub base_url: Option<String>,
    pub email_env: String,
    pub token_env: String,
    /// Custom field holding acceptance criteria, e.g. `customfield_10035`
    pub acceptance_criteria_field: Option<String>,
    /// Directory of `<KEY>.json` files for the file source
    pub dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for TicketSourceConfig {
    fn default() -> Self {
        Self {
            source: TicketSourceKind::Jira,
            base_url: None,
            email_env: "JIRA_EMAIL".to_string(),
            token_env: "JIRA_API_TOKEN".to_string(),
            acceptance_criteria_field: None,
            dir: PathBuf::from("tickets"),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackend::File, dir: PathBuf::from(".testgen/test-cases") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: TestgenConfig = toml::from_str(
            r#"
            [provider]
            model = "llama-3.1-70b"
            base_url = "https://api.groq.com/openai/v1"

            [tickets]
            source = "file"
            dir = "fixtures/tickets"
            "#,
        )
        .unwrap();

        assert_eq!(config.provider.model, "llama-3.1-70b");
        assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.tickets.source, TicketSourceKind::File);
        assert_eq!(config.pipeline.min_yield, 8);
        assert_eq!(config.storage.backend, StorageBackend::File);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("testgen.toml");

        let mut config = TestgenConfig::default();
        config.server.port = 9191;
        config.pipeline.dedup_threshold = 0.8;
        config.save(&path).unwrap();

        let loaded = TestgenConfig::from_file(&path).unwrap();
        assert_eq!(loaded.server.port, 9191);
        assert_eq!(loaded.pipeline.dedup_threshold, 0.8);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryConfig::default().policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(TestgenConfig::load_or_default(Some(Path::new("/nonexistent/testgen.toml"))).is_err());
        assert!(TestgenConfig::load_or_default(None).is_ok());
    }
}
