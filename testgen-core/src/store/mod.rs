//! Persistence for generated test cases, keyed by ticket

pub mod json_file;
pub mod memory;

use crate::config::{StorageBackend, StorageConfig};
use crate::test_gen::TestCase;
use crate::ticket::TicketKey;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use json_file::JsonFileTestCaseStore;
pub use memory::InMemoryTestCaseStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored test cases for {key} are corrupt: {message}")]
    Corrupt { key: TicketKey, message: String },

    #[error("Failed to serialize test cases: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TestCaseStore: Send + Sync {
    /// All test cases persisted for a ticket, in insertion order
    async fn find_by_ticket(&self, key: &TicketKey) -> StoreResult<Vec<TestCase>>;

    /// Append test cases to the ticket's set
    async fn save_all(&self, key: &TicketKey, cases: &[TestCase]) -> StoreResult<()>;

    /// Swap the ticket's whole set for `cases` in a single write, returning
    /// how many records were replaced. On error the previous set is untouched.
    async fn replace_by_ticket(&self, key: &TicketKey, cases: &[TestCase]) -> StoreResult<usize>;

    /// Remove the ticket's set, returning how many records were removed
    async fn delete_by_ticket(&self, key: &TicketKey) -> StoreResult<usize>;
}

pub fn from_config(config: &StorageConfig) -> Arc<dyn TestCaseStore> {
    match config.backend {
        StorageBackend::File => Arc::new(JsonFileTestCaseStore::new(&config.dir)),
        StorageBackend::Memory => Arc::new(InMemoryTestCaseStore::new()),
    }
}
