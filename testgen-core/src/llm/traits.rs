//! Traits for generation provider implementations

use super::errors::ProviderError;
use crate::test_gen::Prompt;
use async_trait::async_trait;
use std::sync::Arc;

/// Turns a prompt into raw model output
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Run one generation request, without retries
    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError>;
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String, ProviderError> {
        (**self).generate(prompt).await
    }
}
