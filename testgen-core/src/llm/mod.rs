//! Text-generation provider boundary
//!
//! The pipeline only sees [`GenerationClient`]; concrete providers live
//! behind it so tests can substitute a scripted client.

pub mod errors;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod openai_compat;
pub mod retry;
pub mod traits;

pub use errors::{ProviderError, ProviderResult};
#[cfg(any(test, feature = "test-util"))]
pub use mock::ScriptedClient;
pub use openai_compat::OpenAiCompatClient;
pub use retry::{RetryPolicy, generate_with_retry};
pub use traits::GenerationClient;
