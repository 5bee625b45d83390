use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use repohub_plugins::RepositoryRecord;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Repository already stored: {0}")]
    Conflict(String),

    #[error("Content store backend failure: {0}")]
    Backend(String),
}

/// Persistence boundary for repository records.
///
/// The manager owns no storage of its own; a host application provides a
/// real implementation, keyed by (source, machine_name).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist a record and return the id of the new entry.
    async fn save(&self, record: RepositoryRecord) -> StoreResult<String>;

    async fn find_by_source(
        &self,
        source: &str,
        machine_name: &str,
    ) -> StoreResult<Option<RepositoryRecord>>;

    async fn list(&self) -> StoreResult<Vec<RepositoryRecord>>;
}

/// Reference in-memory store, also the test double for the manager flow.
pub struct InMemoryContentStore {
    entries: RwLock<HashMap<(String, String), (String, RepositoryRecord)>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn save(&self, record: RepositoryRecord) -> StoreResult<String> {
        let key = (record.source.clone(), record.machine_name.clone());
        let mut entries = self.entries.write().await;
        if entries.contains_key(&key) {
            return Err(StoreError::Conflict(format!("{}:{}", key.0, key.1)));
        }
        let id = Uuid::new_v4().to_string();
        entries.insert(key, (id.clone(), record));
        Ok(id)
    }

    async fn find_by_source(
        &self,
        source: &str,
        machine_name: &str,
    ) -> StoreResult<Option<RepositoryRecord>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(source.to_string(), machine_name.to_string()))
            .map(|(_, record)| record.clone()))
    }

    async fn list(&self) -> StoreResult<Vec<RepositoryRecord>> {
        let entries = self.entries.read().await;
        Ok(entries.values().map(|(_, record)| record.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: &str, machine_name: &str) -> RepositoryRecord {
        RepositoryRecord {
            machine_name: machine_name.to_string(),
            label: machine_name.to_string(),
            description: String::new(),
            num_open_issues: 0,
            url: format!("https://example.com/{machine_name}"),
            source: source.to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let store = InMemoryContentStore::new();
        let id = store.save(record("github", "name")).await.unwrap();
        assert!(!id.is_empty());

        let found = store.find_by_source("github", "name").await.unwrap();
        assert_eq!(found.unwrap().machine_name, "name");

        assert!(store.find_by_source("github", "other").await.unwrap().is_none());
        assert!(store.find_by_source("gitlab", "name").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_save_conflicts() {
        let store = InMemoryContentStore::new();
        store.save(record("github", "name")).await.unwrap();

        let err = store.save(record("github", "name")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // same machine name under a different source is a distinct entry
        store.save(record("gitlab", "name")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }
}
