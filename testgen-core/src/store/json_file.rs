//! One pretty-printed JSON file per ticket under a storage directory
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! reader never sees a half-written set. File names are the percent-encoded
//! ticket key, so distinct keys never share a file.

use super::{StoreError, StoreResult, TestCaseStore};
use crate::test_gen::TestCase;
use crate::ticket::TicketKey;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct JsonFileTestCaseStore {
    dir: PathBuf,
}

impl JsonFileTestCaseStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    fn path_for(&self, key: &TicketKey) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key.as_str())))
    }

    async fn read(&self, key: &TicketKey) -> StoreResult<Vec<TestCase>> {
        let path = self.path_for(key);
        let mut cases: Vec<TestCase> = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| StoreError::Corrupt { key: key.clone(), message: e.to_string() })?,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let total = cases.len();
        cases.retain(|case| &case.ticket_key == key);
        if cases.len() != total {
            warn!("Ignored {} records in {} that belong to another ticket", total - cases.len(), path.display());
        }
        Ok(cases)
    }

    async fn write(&self, key: &TicketKey, cases: &[TestCase]) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let temp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(cases)?;
        fs::write(&temp, content).await?;
        fs::rename(&temp, &path).await?;

        debug!("Wrote {} test cases to {}", cases.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl TestCaseStore for JsonFileTestCaseStore {
    async fn find_by_ticket(&self, key: &TicketKey) -> StoreResult<Vec<TestCase>> {
        self.read(key).await
    }

    async fn save_all(&self, key: &TicketKey, cases: &[TestCase]) -> StoreResult<()> {
        if cases.is_empty() {
            return Ok(());
        }
        let mut existing = self.read(key).await?;
        existing.extend_from_slice(cases);
        self.write(key, &existing).await
    }

    async fn replace_by_ticket(&self, key: &TicketKey, cases: &[TestCase]) -> StoreResult<usize> {
        if cases.is_empty() {
            return self.delete_by_ticket(key).await;
        }

        let previous = match self.read(key).await {
            Ok(existing) => existing.len(),
            Err(StoreError::Corrupt { message, .. }) => {
                warn!("Overwriting corrupt test case file for {}: {}", key, message);
                0
            }
            Err(e) => return Err(e),
        };
        self.write(key, cases).await?;
        Ok(previous)
    }

    async fn delete_by_ticket(&self, key: &TicketKey) -> StoreResult<usize> {
        let existing = self.read(key).await?;
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(existing.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTestCaseStore;
    use crate::test_gen::{Priority, ProcessedDraft, TestCategory};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn case(key: &TicketKey, title: &str) -> TestCase {
        let draft = ProcessedDraft {
            title: title.to_string(),
            description: String::new(),
            preconditions: Vec::new(),
            steps: vec!["Open the settings page".to_string()],
            expected_result: "Settings are shown".to_string(),
            priority: Priority::Medium,
            category: TestCategory::Positive,
            tags: BTreeSet::new(),
            step_flags: Vec::new(),
        };
        TestCase::from_processed(draft, key)
    }

    async fn exercise(store: &dyn TestCaseStore) {
        let key = TicketKey::new("SET-1");
        let other = TicketKey::new("SET-2");

        assert!(store.find_by_ticket(&key).await.unwrap().is_empty());

        store.save_all(&key, &[case(&key, "First"), case(&key, "Second")]).await.unwrap();
        store.save_all(&key, &[case(&key, "Third")]).await.unwrap();
        store.save_all(&other, &[case(&other, "Elsewhere")]).await.unwrap();

        let titles: Vec<String> =
            store.find_by_ticket(&key).await.unwrap().into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);

        assert_eq!(store.replace_by_ticket(&key, &[case(&key, "Fresh")]).await.unwrap(), 3);
        let titles: Vec<String> =
            store.find_by_ticket(&key).await.unwrap().into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["Fresh"]);
        store.save_all(&key, &[case(&key, "Second"), case(&key, "Third")]).await.unwrap();

        assert_eq!(store.delete_by_ticket(&key).await.unwrap(), 3);
        assert_eq!(store.delete_by_ticket(&key).await.unwrap(), 0);
        assert!(store.find_by_ticket(&key).await.unwrap().is_empty());
        assert_eq!(store.find_by_ticket(&other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_operations() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileTestCaseStore::new(temp_dir.path().join("cases"));
        exercise(&store).await;
        assert!(!temp_dir.path().join("cases").join("SET-1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_memory_store_operations() {
        exercise(&InMemoryTestCaseStore::new()).await;
    }

    #[tokio::test]
    async fn test_similar_keys_do_not_share_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileTestCaseStore::new(temp_dir.path());

        let dotted = TicketKey::new("PROJ.1");
        store.save_all(&dotted, &[case(&dotted, "Dotted")]).await.unwrap();

        for lookalike in ["PROJ_1", "PROJ 1", "PROJ-1"] {
            assert!(store.find_by_ticket(&TicketKey::new(lookalike)).await.unwrap().is_empty(), "{}", lookalike);
        }
        assert_eq!(store.find_by_ticket(&dotted).await.unwrap().len(), 1);

        let odd = TicketKey::new("../weird key");
        store.save_all(&odd, &[case(&odd, "Odd")]).await.unwrap();
        assert!(temp_dir.path().join("..%2Fweird%20key.json").exists());
        assert_eq!(store.find_by_ticket(&odd).await.unwrap()[0].title, "Odd");
    }

    #[tokio::test]
    async fn test_records_of_another_ticket_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileTestCaseStore::new(temp_dir.path());
        let key = TicketKey::new("MIX-1");
        let stranger = TicketKey::new("MIX-2");

        let records = vec![case(&key, "Mine"), case(&stranger, "Not mine")];
        std::fs::write(temp_dir.path().join("MIX-1.json"), serde_json::to_string(&records).unwrap()).unwrap();

        let found = store.find_by_ticket(&key).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Mine");
    }

    #[tokio::test]
    async fn test_corruption_is_reported_and_replace_recovers() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileTestCaseStore::new(temp_dir.path());
        let key = TicketKey::new("BROKEN-1");

        std::fs::write(temp_dir.path().join("BROKEN-1.json"), "not json").unwrap();
        let result = store.find_by_ticket(&key).await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));

        assert_eq!(store.replace_by_ticket(&key, &[case(&key, "Repaired")]).await.unwrap(), 0);
        assert_eq!(store.find_by_ticket(&key).await.unwrap()[0].title, "Repaired");
    }
}
