//! OpenAI-compatible chat completion client
//!
//! Works with OpenAI, Groq, Together, OpenRouter, local vLLM/Ollama gateways
//! and anything else that speaks `POST {base_url}/chat/completions`.

use super::errors::ProviderError;
use super::traits::GenerationClient;
use crate::config::ProviderConfig;
use crate::test_gen::Prompt;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub struct OpenAiCompatClient {
    client: Client,
    config: ProviderConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatClient {
    /// Build from configuration, reading the key from `api_key_env`
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ProviderError::config_missing(&config.api_key_env))?;

        Self::with_api_key(config.clone(), api_key)
    }

    pub fn with_api_key(config: ProviderConfig, api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config, api_key: api_key.into() })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn transport_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::timeout(Duration::from_secs(self.config.timeout_secs))
        } else if error.is_decode() {
            ProviderError::malformed(error.to_string())
        } else {
            ProviderError::unavailable(format!("{} request failed: {}", self.config.name, error))
        }
    }
}

/// Map a non-success HTTP status onto the provider error taxonomy
pub fn classify_status(status: u16, retry_after: Option<Duration>, body: &str) -> ProviderError {
    match status {
        401 | 403 => ProviderError::unauthenticated(format!("status {}: {}", status, body)),
        408 | 504 => ProviderError::unavailable(format!("gateway timeout (status {})", status)),
        429 => ProviderError::rate_limited(retry_after),
        500..=599 => ProviderError::unavailable(format!("status {}: {}", status, body)),
        _ => ProviderError::malformed(format!("unexpected status {}: {}", status, body)),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl GenerationClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: &prompt.system },
                ChatMessage { role: "user", content: &prompt.user },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut req = self.client.post(self.endpoint());

        // Add authentication header
        if self.config.auth_prefix.is_empty() {
            req = req.header(&self.config.auth_header, &self.api_key);
        } else {
            req = req.header(
                &self.config.auth_header,
                format!("{} {}", self.config.auth_prefix, self.api_key),
            );
        }

        debug!("Sending generation request to {} ({})", self.config.name, self.config.model);

        let response = req.json(&request).send().await.map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            warn!("{} API error {}: {}", self.config.name, status, body);
            return Err(classify_status(status.as_u16(), retry_after, &body));
        }

        let result: ChatCompletionResponse =
            response.json().await.map_err(|e| self.transport_error(e))?;

        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ProviderError::malformed(format!("no completion content from {}", self.config.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_status_classification() {
        assert!(matches!(classify_status(401, None, ""), ProviderError::Unauthenticated { .. }));
        assert!(matches!(classify_status(403, None, ""), ProviderError::Unauthenticated { .. }));
        assert_eq!(
            classify_status(429, Some(Duration::from_secs(7)), ""),
            ProviderError::rate_limited(Some(Duration::from_secs(7)))
        );
        assert!(matches!(classify_status(503, None, "overloaded"), ProviderError::Unavailable { .. }));
        assert!(matches!(classify_status(400, None, "bad"), ProviderError::MalformedUpstreamResponse { .. }));
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_missing_api_key() {
        let config = ProviderConfig {
            api_key_env: "TESTGEN_TEST_UNSET_PROVIDER_KEY".to_string(),
            ..ProviderConfig::default()
        };
        let result = OpenAiCompatClient::from_config(&config);
        assert!(matches!(result, Err(ProviderError::ConfigMissing { .. })));
    }

    #[test]
    fn test_endpoint_and_request_shape() {
        let config = ProviderConfig { base_url: "http://localhost:11434/v1/".to_string(), ..ProviderConfig::default() };
        let client = OpenAiCompatClient::with_api_key(config, "sk-test").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");

        let request = ChatCompletionRequest {
            model: "m",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.5,
            max_tokens: 10,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 10);
    }
}
