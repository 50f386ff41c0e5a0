//! Bounded exponential backoff around a single generation call

use super::errors::ProviderError;
use super::traits::GenerationClient;
use crate::test_gen::Prompt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Check if an error is retryable
    pub fn is_retryable(&self, error: &ProviderError) -> bool {
        error.is_transient()
    }

    /// Delay before retry number `retry` (0-based): 1s, 2s, 4s with the defaults
    pub fn delay_for(&self, retry: usize) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(retry.min(32) as i32);
        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Call `client`, retrying transient failures per `policy`
pub async fn generate_with_retry(
    client: &dyn GenerationClient,
    prompt: &Prompt,
    policy: &RetryPolicy,
) -> Result<String, ProviderError> {
    let mut attempt = 0;

    loop {
        match client.generate(prompt).await {
            Ok(text) => {
                debug!("{} returned {} bytes on attempt {}", client.name(), text.len(), attempt + 1);
                return Ok(text);
            }
            Err(e) => {
                if !policy.is_retryable(&e) || attempt >= policy.max_retries {
                    return Err(e);
                }

                let mut backoff = policy.delay_for(attempt);
                if let ProviderError::RateLimited { retry_after: Some(after) } = &e {
                    backoff = backoff.max(*after);
                }

                attempt += 1;
                warn!(
                    "{} failed ({}), retry {}/{} in {:?}",
                    client.name(),
                    e,
                    attempt,
                    policy.max_retries,
                    backoff
                );
                sleep(backoff).await;
            }
        }
    }
}
