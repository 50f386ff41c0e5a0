//! Per-ticket locking in front of the test case store
//!
//! A ticket is either cached (a non-empty persisted set exists) or empty. All
//! reads and writes of a ticket's set happen while holding its [`TicketGuard`],
//! so generation and invalidation of the same ticket never interleave.

use crate::store::{StoreResult, TestCaseStore};
use crate::test_gen::TestCase;
use crate::ticket::TicketKey;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type LockMap = DashMap<TicketKey, Arc<Mutex<()>>>;

/// Exclusive access to one ticket's test case set; released on drop
pub struct TicketGuard {
    key: TicketKey,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl TicketGuard {
    pub fn key(&self) -> &TicketKey {
        &self.key
    }
}

impl Drop for TicketGuard {
    fn drop(&mut self) {
        // Release before checking, so an idle entry holds only the map's reference
        drop(self.guard.take());
        self.locks.remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[derive(Clone)]
pub struct CacheGate {
    store: Arc<dyn TestCaseStore>,
    locks: Arc<LockMap>,
}

impl CacheGate {
    pub fn new(store: Arc<dyn TestCaseStore>) -> Self {
        Self { store, locks: Arc::new(DashMap::new()) }
    }

    pub async fn lock(&self, key: &TicketKey) -> TicketGuard {
        let lock = Arc::clone(self.locks.entry(key.clone()).or_default().value());
        let guard = lock.lock_owned().await;
        TicketGuard { key: key.clone(), guard: Some(guard), locks: Arc::clone(&self.locks) }
    }

    /// Persisted set for the guarded ticket, `None` when there is nothing stored
    pub async fn cached(&self, guard: &TicketGuard) -> StoreResult<Option<Vec<TestCase>>> {
        let cases = self.store.find_by_ticket(guard.key()).await?;
        Ok((!cases.is_empty()).then_some(cases))
    }

    /// Swap the guarded ticket's set for `cases`; a failed write keeps the old set
    pub async fn replace(&self, guard: &TicketGuard, cases: &[TestCase]) -> StoreResult<()> {
        let removed = self.store.replace_by_ticket(guard.key(), cases).await?;
        debug!("Replaced {} stored test cases for {} with {}", removed, guard.key(), cases.len());
        Ok(())
    }

    pub async fn invalidate(&self, key: &TicketKey) -> StoreResult<usize> {
        let guard = self.lock(key).await;
        self.store.delete_by_ticket(guard.key()).await
    }

    /// Tickets with a lock currently held or awaited
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryTestCaseStore, StoreError};
    use crate::test_gen::{Priority, ProcessedDraft, TestCategory};
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// In-memory store whose writes can be switched to fail
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryTestCaseStore,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> StoreResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TestCaseStore for FlakyStore {
        async fn find_by_ticket(&self, key: &TicketKey) -> StoreResult<Vec<TestCase>> {
            self.inner.find_by_ticket(key).await
        }

        async fn save_all(&self, key: &TicketKey, cases: &[TestCase]) -> StoreResult<()> {
            self.check()?;
            self.inner.save_all(key, cases).await
        }

        async fn replace_by_ticket(&self, key: &TicketKey, cases: &[TestCase]) -> StoreResult<usize> {
            self.check()?;
            self.inner.replace_by_ticket(key, cases).await
        }

        async fn delete_by_ticket(&self, key: &TicketKey) -> StoreResult<usize> {
            self.inner.delete_by_ticket(key).await
        }
    }

    fn case(key: &TicketKey) -> TestCase {
        TestCase::from_processed(
            ProcessedDraft {
                title: "Open the report".to_string(),
                description: String::new(),
                preconditions: Vec::new(),
                steps: vec!["Open the monthly report".to_string()],
                expected_result: "The report renders".to_string(),
                priority: Priority::Low,
                category: TestCategory::Positive,
                tags: BTreeSet::new(),
                step_flags: Vec::new(),
            },
            key,
        )
    }

    #[tokio::test]
    async fn test_cached_replace_and_invalidate() {
        let gate = CacheGate::new(Arc::new(InMemoryTestCaseStore::new()));
        let key = TicketKey::new("REP-1");

        {
            let guard = gate.lock(&key).await;
            assert!(gate.cached(&guard).await.unwrap().is_none());
            gate.replace(&guard, &[case(&key), case(&key)]).await.unwrap();
            gate.replace(&guard, &[case(&key)]).await.unwrap();
            assert_eq!(gate.cached(&guard).await.unwrap().map(|c| c.len()), Some(1));
        }

        assert_eq!(gate.invalidate(&key).await.unwrap(), 1);
        assert_eq!(gate.invalidate(&key).await.unwrap(), 0);
        assert_eq!(gate.active_locks(), 0);
    }

    #[tokio::test]
    async fn test_failed_replace_keeps_previous_set() {
        let store = Arc::new(FlakyStore::default());
        let gate = CacheGate::new(store.clone());
        let key = TicketKey::new("REP-4");

        let guard = gate.lock(&key).await;
        gate.replace(&guard, &[case(&key), case(&key)]).await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let result = gate.replace(&guard, &[case(&key)]).await;

        assert!(matches!(result, Err(StoreError::Io(_))));
        assert_eq!(gate.cached(&guard).await.unwrap().map(|c| c.len()), Some(2));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive_per_ticket() {
        let gate = CacheGate::new(Arc::new(InMemoryTestCaseStore::new()));
        let key = TicketKey::new("REP-2");

        let guard = gate.lock(&key).await;

        let waiting = tokio::time::timeout(Duration::from_millis(50), gate.lock(&key)).await;
        assert!(waiting.is_err());

        // Other tickets are not blocked
        let other = tokio::time::timeout(Duration::from_millis(50), gate.lock(&TicketKey::new("REP-3"))).await;
        assert!(other.is_ok());
        drop(other);

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), gate.lock(&key)).await;
        assert!(reacquired.is_ok());
        drop(reacquired);
        assert_eq!(gate.active_locks(), 0);
    }
}
