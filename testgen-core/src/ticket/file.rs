//! Tickets exported as JSON files, one `<KEY>.json` per ticket

use super::{Ticket, TicketKey, TicketRecord, TicketSource, TicketSourceError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileTicketSource {
    dir: PathBuf,
}

impl FileTicketSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &TicketKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

#[async_trait]
impl TicketSource for FileTicketSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_ticket_by_key(&self, key: &TicketKey) -> Result<Ticket, TicketSourceError> {
        // Keys come from callers; refuse anything that could leave the directory
        if key.as_str().is_empty() || key.as_str().contains(['/', '\\']) || key.as_str().contains("..") {
            return Err(TicketSourceError::not_found(key));
        }

        let path = self.path_for(key);
        debug!("Reading ticket {} from {}", key, path.display());

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TicketSourceError::not_found(key));
            }
            Err(e) => {
                return Err(TicketSourceError::unavailable(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let record: TicketRecord = serde_json::from_str(&content).map_err(|e| {
            TicketSourceError::malformed(format!("{}: {}", path.display(), e))
        })?;

        Ok(record.into_ticket())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::TicketType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_ticket_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("SHOP-12.json"),
            r#"{"key": "SHOP-12", "type": "Bug", "title": "Cart total ignores discount", "description": "Apply code SAVE10 and the total stays the same."}"#,
        )
        .unwrap();

        let source = FileTicketSource::new(temp_dir.path());
        let ticket = source.get_ticket_by_key(&TicketKey::new("SHOP-12")).await.unwrap();

        assert_eq!(ticket.ticket_type, TicketType::Bug);
        assert_eq!(ticket.title, "Cart total ignores discount");
        assert!(ticket.acceptance_criteria.is_none());
    }

    #[tokio::test]
    async fn test_missing_and_malformed_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("BAD-1.json"), "{ not json").unwrap();
        let source = FileTicketSource::new(temp_dir.path());

        let missing = source.get_ticket_by_key(&TicketKey::new("NONE-1")).await;
        assert!(matches!(missing, Err(TicketSourceError::NotFound { .. })));

        let traversal = source.get_ticket_by_key(&TicketKey::new("../etc/passwd")).await;
        assert!(matches!(traversal, Err(TicketSourceError::NotFound { .. })));

        let malformed = source.get_ticket_by_key(&TicketKey::new("BAD-1")).await;
        assert!(matches!(malformed, Err(TicketSourceError::Malformed { .. })));
    }
}
