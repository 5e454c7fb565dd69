use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::api::health::HealthState;
use crate::error::{CacheError, Result};
use crate::store::kv::KvStore;

/// Typed, time-bounded view over a [`KvStore`].
///
/// Every call is capped by `op_timeout`. Failures are logged here, counted
/// on [`HealthState`], and still returned so callers decide whether to skip
/// or surface them. Malformed JSON comes back as [`CacheError::Json`].
#[derive(Clone)]
pub struct SnapshotStore {
    kv: Arc<dyn KvStore>,
    op_timeout: Duration,
    health: Arc<HealthState>,
}

impl SnapshotStore {
    pub fn new(kv: Arc<dyn KvStore>, op_timeout: Duration, health: Arc<HealthState>) -> Self {
        Self { kv, op_timeout, health }
    }

    async fn guard<T, F>(&self, op: &'static str, key: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(r) => r,
            Err(_) => Err(CacheError::Timeout(format!("{op} {key}"))),
        };
        if let Err(e) = &result {
            self.health.inc_store_failures();
            warn!(op, key, error = %e, "store operation failed");
        }
        result
    }

    pub async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.guard("GET", key, self.kv.get(key)).await
    }

    pub async fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.guard("SET", key, self.kv.set(key, value)).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.guard("EXISTS", key, self.kv.exists(key)).await
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        self.guard("DEL", key, self.kv.del(key)).await
    }

    pub async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.guard("SCAN", prefix, self.kv.scan_prefix(prefix)).await
    }

    /// `Ok(None)` when the key is absent or holds an empty string.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<T>(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                let sample: String = raw.chars().take(120).collect();
                warn!(key, error = %e, "malformed cached value: {sample}");
                Err(e.into())
            }
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)?;
        self.set_raw(key, &encoded).await
    }

    /// Integer-string keys. Unparseable values read as absent.
    pub async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        let raw = self.get_raw(key).await?;
        Ok(raw.and_then(|v| v.trim().parse::<i64>().ok()))
    }

    pub async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_raw(key, &value.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::MemoryStore;
    use async_trait::async_trait;

    fn snapshot_store(kv: Arc<dyn KvStore>) -> (SnapshotStore, Arc<HealthState>) {
        let health = Arc::new(HealthState::new());
        (SnapshotStore::new(kv, Duration::from_millis(50), Arc::clone(&health)), health)
    }

    #[tokio::test]
    async fn json_round_trip_and_absence() {
        let (store, _) = snapshot_store(MemoryStore::new());
        assert_eq!(store.get_json::<Vec<i64>>("k").await.unwrap(), None);
        store.set_json("k", &vec![1i64, 2, 3]).await.unwrap();
        assert_eq!(store.get_json::<Vec<i64>>("k").await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn malformed_json_is_an_error() {
        let kv = MemoryStore::new();
        kv.set("k", "{not json").await.unwrap();
        let (store, _) = snapshot_store(kv);
        assert!(matches!(store.get_json::<Vec<i64>>("k").await, Err(CacheError::Json(_))));
    }

    #[tokio::test]
    async fn integer_keys_tolerate_garbage() {
        let kv = MemoryStore::new();
        kv.set("n", "abc").await.unwrap();
        let (store, _) = snapshot_store(kv);
        assert_eq!(store.get_i64("n").await.unwrap(), None);
        store.set_i64("n", 186).await.unwrap();
        assert_eq!(store.get_i64("n").await.unwrap(), Some(186));
    }

    struct StalledStore;

    #[async_trait]
    impl KvStore for StalledStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
        async fn del(&self, _key: &str) -> Result<()> {
            Ok(())
        }
        async fn exists(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
        async fn scan_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn slow_store_times_out_and_is_counted() {
        let (store, health) = snapshot_store(Arc::new(StalledStore));
        let result = store.get_raw("k").await;
        assert!(matches!(result, Err(CacheError::Timeout(_))));
        assert!(store.set_raw("k", "v").await.is_err());
        assert_eq!(health.store_failures(), 2);
    }
}
