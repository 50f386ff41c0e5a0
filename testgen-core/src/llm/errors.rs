//! Error types for generation provider calls
//!
//! Transient variants (`Timeout`, `RateLimited`, `Unavailable`) are retried by
//! the caller; everything else is surfaced immediately.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Request timed out
    #[error("Request timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Provider asked us to slow down
    #[error("Rate limit exceeded. Retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// API key is missing, invalid or lacks access
    #[error("Authentication failed: {message}")]
    Unauthenticated { message: String },

    /// Provider could not be reached or returned a server error
    #[error("Provider unavailable: {message}")]
    Unavailable { message: String },

    /// Provider answered with something that is not a completion
    #[error("Malformed upstream response: {message}")]
    MalformedUpstreamResponse { message: String },

    /// Credentials are not configured at all
    #[error("Provider is not configured: environment variable {variable} is not set")]
    ConfigMissing { variable: String },
}

impl ProviderError {
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited { retry_after }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated { message: message.into() }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedUpstreamResponse { message: message.into() }
    }

    pub fn config_missing(variable: impl Into<String>) -> Self {
        Self::ConfigMissing { variable: variable.into() }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout { .. }
                | ProviderError::RateLimited { .. }
                | ProviderError::Unavailable { .. }
        )
    }
}

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedUpstreamResponse { message: err.to_string() }
    }
}
