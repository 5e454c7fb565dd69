use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;

/// Minimal key-value surface the cache needs. Values are opaque strings;
/// typing happens one layer up in [`SnapshotStore`](super::SnapshotStore).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    /// Writes without expiry, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn del(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
    /// Every key starting with `prefix`, in no particular order.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Process-local store used by the test suite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Synchronous peek for tests and diagnostics.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del_round() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);
        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
        assert!(store.exists("a").await.unwrap());
        store.del("a").await.unwrap();
        assert!(!store.exists("a").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn scan_prefix_matches_only_prefix() {
        let store = MemoryStore::new();
        store.set("odds:live:match-4:market-1:x", "").await.unwrap();
        store.set("odds:live:match-4:keys", "").await.unwrap();
        store.set("odds:live:match-42:keys", "").await.unwrap();
        store.set("odds:live:match-4", "").await.unwrap();

        let mut found = store.scan_prefix("odds:live:match-4:").await.unwrap();
        found.sort();
        assert_eq!(
            found,
            vec!["odds:live:match-4:keys".to_string(), "odds:live:match-4:market-1:x".to_string()]
        );
    }
}
