use super::{StoreResult, TestCaseStore};
use crate::test_gen::TestCase;
use crate::ticket::TicketKey;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryTestCaseStore {
    cases: RwLock<HashMap<TicketKey, Vec<TestCase>>>,
}

impl InMemoryTestCaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TestCaseStore for InMemoryTestCaseStore {
    async fn find_by_ticket(&self, key: &TicketKey) -> StoreResult<Vec<TestCase>> {
        Ok(self.cases.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn save_all(&self, key: &TicketKey, cases: &[TestCase]) -> StoreResult<()> {
        if cases.is_empty() {
            return Ok(());
        }
        self.cases.write().await.entry(key.clone()).or_default().extend_from_slice(cases);
        Ok(())
    }

    async fn replace_by_ticket(&self, key: &TicketKey, cases: &[TestCase]) -> StoreResult<usize> {
        let mut stored = self.cases.write().await;
        let previous = if cases.is_empty() {
            stored.remove(key)
        } else {
            stored.insert(key.clone(), cases.to_vec())
        };
        Ok(previous.map(|cases| cases.len()).unwrap_or(0))
    }

    async fn delete_by_ticket(&self, key: &TicketKey) -> StoreResult<usize> {
        Ok(self.cases.write().await.remove(key).map(|cases| cases.len()).unwrap_or(0))
    }
}
