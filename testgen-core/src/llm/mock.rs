//! Scripted generation client for testing
//!
//! Replays canned responses and errors in order and records every prompt it
//! receives. Compiled for unit tests and behind the `test-util` feature.

use super::errors::ProviderError;
use super::traits::GenerationClient;
use crate::test_gen::Prompt;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Deterministic stand-in for a generation provider
#[derive(Clone, Default)]
pub struct ScriptedClient {
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    fallback: Arc<Mutex<Option<String>>>,
    call_history: Arc<Mutex<Vec<Prompt>>>,
    latency: Arc<Mutex<Option<Duration>>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that answers every call with `response`
    pub fn always(response: impl Into<String>) -> Self {
        let client = Self::new();
        client.set_fallback(response);
        client
    }

    /// Queue a response to return
    pub fn push_response(&self, response: impl Into<String>) {
        locked(&self.script).push_back(Ok(response.into()));
    }

    /// Queue an error to return
    pub fn push_error(&self, error: ProviderError) {
        locked(&self.script).push_back(Err(error));
    }

    /// Response used once the queue is empty
    pub fn set_fallback(&self, response: impl Into<String>) {
        *locked(&self.fallback) = Some(response.into());
    }

    /// Delay every answer, to keep a call in flight
    pub fn set_latency(&self, latency: Duration) {
        *locked(&self.latency) = Some(latency);
    }

    pub fn call_count(&self) -> usize {
        locked(&self.call_history).len()
    }

    /// Prompts received so far, oldest first
    pub fn calls(&self) -> Vec<Prompt> {
        locked(&self.call_history).clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        locked(&self.call_history).push(prompt.clone());

        let latency = *locked(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(next) = locked(&self.script).pop_front() {
            return next;
        }

        locked(&self.fallback)
            .clone()
            .ok_or_else(|| ProviderError::unavailable("scripted client has no responses left"))
    }
}
