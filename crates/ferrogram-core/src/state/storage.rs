//! State storage backends.
//!
//! # Cancellation
//!
//! Every operation is a future. Dropping it (for example through
//! `tokio::time::timeout`) cancels it; backends add no deadlines of their own.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StorageError, StorageResult};

/// Open-ended per-user data bag.
pub type DataMap = HashMap<String, Value>;

/// Everything stored for one user key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// Current state label; empty means no state.
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub data: DataMap,
}

impl UserContext {
    pub fn has_state(&self) -> bool {
        !self.state.is_empty()
    }
}

// ─── StateStorage trait ───────────────────────────────────────────────────────

/// Persistence boundary required by the state manager.
///
/// Implementations must be safe to share between concurrent dispatches.
/// Reads of a missing key return an empty context rather than an error.
#[async_trait]
pub trait StateStorage: Send + Sync + 'static {
    /// State and data together.
    async fn get_context(&self, key: &str) -> StorageResult<UserContext>;

    /// State label, empty when unset.
    async fn get_state(&self, key: &str) -> StorageResult<String>;

    async fn set_state(&self, key: &str, state: &str) -> StorageResult<()>;

    /// Empties the state label without touching data.
    async fn clear_state(&self, key: &str) -> StorageResult<()>;

    async fn get_data(&self, key: &str) -> StorageResult<DataMap>;

    /// Merges `data` into the stored bag; keys not mentioned are kept.
    async fn upsert_data(&self, key: &str, data: DataMap) -> StorageResult<()>;

    /// Empties the data bag without touching state.
    async fn clear_data(&self, key: &str) -> StorageResult<()>;

    /// Merges `data` and sets `state` unless it is empty, in which case the
    /// stored label is left as is.
    async fn upsert_context(&self, key: &str, state: &str, data: DataMap) -> StorageResult<()>;

    /// Removes everything stored for `key`.
    async fn clear_all(&self, key: &str) -> StorageResult<()>;

    /// Releases backend resources.
    async fn close(&self) -> StorageResult<()>;
}

// ─── MemoryStorage ────────────────────────────────────────────────────────────

/// In-process backend guarded by a single lock.
///
/// Every operation serializes on that lock, across all users.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, UserContext>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored user keys.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn get_context(&self, key: &str) -> StorageResult<UserContext> {
        Ok(self.entries.lock().get(key).cloned().unwrap_or_default())
    }

    async fn get_state(&self, key: &str) -> StorageResult<String> {
        Ok(self
            .entries
            .lock()
            .get(key)
            .map(|uc| uc.state.clone())
            .unwrap_or_default())
    }

    async fn set_state(&self, key: &str, state: &str) -> StorageResult<()> {
        self.entries
            .lock()
            .entry(key.to_string())
            .or_default()
            .state = state.to_string();
        Ok(())
    }

    async fn clear_state(&self, key: &str) -> StorageResult<()> {
        if let Some(uc) = self.entries.lock().get_mut(key) {
            uc.state.clear();
        }
        Ok(())
    }

    async fn get_data(&self, key: &str) -> StorageResult<DataMap> {
        Ok(self
            .entries
            .lock()
            .get(key)
            .map(|uc| uc.data.clone())
            .unwrap_or_default())
    }

    async fn upsert_data(&self, key: &str, data: DataMap) -> StorageResult<()> {
        self.entries
            .lock()
            .entry(key.to_string())
            .or_default()
            .data
            .extend(data);
        Ok(())
    }

    async fn clear_data(&self, key: &str) -> StorageResult<()> {
        if let Some(uc) = self.entries.lock().get_mut(key) {
            uc.data.clear();
        }
        Ok(())
    }

    async fn upsert_context(&self, key: &str, state: &str, data: DataMap) -> StorageResult<()> {
        let mut entries = self.entries.lock();
        let uc = entries.entry(key.to_string()).or_default();
        if !state.is_empty() {
            uc.state = state.to_string();
        }
        uc.data.extend(data);
        Ok(())
    }

    async fn clear_all(&self, key: &str) -> StorageResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// Shared storages are storages too.
#[async_trait]
impl<S: StateStorage + ?Sized> StateStorage for std::sync::Arc<S> {
    async fn get_context(&self, key: &str) -> StorageResult<UserContext> {
        (**self).get_context(key).await
    }

    async fn get_state(&self, key: &str) -> StorageResult<String> {
        (**self).get_state(key).await
    }

    async fn set_state(&self, key: &str, state: &str) -> StorageResult<()> {
        (**self).set_state(key, state).await
    }

    async fn clear_state(&self, key: &str) -> StorageResult<()> {
        (**self).clear_state(key).await
    }

    async fn get_data(&self, key: &str) -> StorageResult<DataMap> {
        (**self).get_data(key).await
    }

    async fn upsert_data(&self, key: &str, data: DataMap) -> StorageResult<()> {
        (**self).upsert_data(key, data).await
    }

    async fn clear_data(&self, key: &str) -> StorageResult<()> {
        (**self).clear_data(key).await
    }

    async fn upsert_context(&self, key: &str, state: &str, data: DataMap) -> StorageResult<()> {
        (**self).upsert_context(key, state, data).await
    }

    async fn clear_all(&self, key: &str) -> StorageResult<()> {
        (**self).clear_all(key).await
    }

    async fn close(&self) -> StorageResult<()> {
        (**self).close().await
    }
}

/// Converts a serializable value into a data bag entry.
pub(crate) fn to_value<T: Serialize + ?Sized>(key: &str, value: &T) -> StorageResult<Value> {
    serde_json::to_value(value).map_err(|e| StorageError::conversion(key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(pairs: &[(&str, Value)]) -> DataMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_missing_key_reads_empty() {
        let store = MemoryStorage::new();
        assert_eq!(store.get_context("u").await.unwrap(), UserContext::default());
        assert_eq!(store.get_state("u").await.unwrap(), "");
        assert!(store.get_data("u").await.unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_data_merges() {
        let store = MemoryStorage::new();
        store
            .upsert_data("u", data(&[("a", json!(1)), ("b", json!("x"))]))
            .await
            .unwrap();
        store.upsert_data("u", data(&[("b", json!("y"))])).await.unwrap();

        let bag = store.get_data("u").await.unwrap();
        assert_eq!(bag["a"], json!(1));
        assert_eq!(bag["b"], json!("y"));
        assert_eq!(store.get_state("u").await.unwrap(), "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_union_fields() {
        let store = std::sync::Arc::new(MemoryStorage::new());
        store.set_state("u", "busy").await.unwrap();

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .upsert_data("u", data(&[(format!("k{i}").as_str(), json!(i))]))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let bag = store.get_data("u").await.unwrap();
        assert_eq!(bag.len(), 32);
        for i in 0..32 {
            assert_eq!(bag[&format!("k{i}")], json!(i));
        }
        assert_eq!(store.get_state("u").await.unwrap(), "busy");
    }

    #[tokio::test]
    async fn test_clear_state_and_data_are_independent() {
        let store = MemoryStorage::new();
        store.set_state("u", "form.name").await.unwrap();
        store.upsert_data("u", data(&[("a", json!(1))])).await.unwrap();

        store.clear_state("u").await.unwrap();
        assert_eq!(store.get_state("u").await.unwrap(), "");
        assert_eq!(store.get_data("u").await.unwrap().len(), 1);

        store.set_state("u", "form.age").await.unwrap();
        store.clear_data("u").await.unwrap();
        assert_eq!(store.get_state("u").await.unwrap(), "form.age");
        assert!(store.get_data("u").await.unwrap().is_empty());

        store.clear_all("u").await.unwrap();
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_clear_on_missing_key_creates_nothing() {
        let store = MemoryStorage::new();
        store.clear_state("ghost").await.unwrap();
        store.clear_data("ghost").await.unwrap();
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_upsert_context_keeps_label_on_empty_state() {
        let store = MemoryStorage::new();
        store
            .upsert_context("u", "s1", data(&[("a", json!(1))]))
            .await
            .unwrap();
        store
            .upsert_context("u", "", data(&[("b", json!(2))]))
            .await
            .unwrap();

        let ctx = store.get_context("u").await.unwrap();
        assert_eq!(ctx.state, "s1");
        assert_eq!(ctx.data.len(), 2);
    }

    #[tokio::test]
    async fn test_reads_are_copies() {
        let store = MemoryStorage::new();
        store.upsert_data("u", data(&[("a", json!(1))])).await.unwrap();

        let mut bag = store.get_data("u").await.unwrap();
        bag.insert("sneaky".into(), json!(true));
        assert_eq!(store.get_data("u").await.unwrap().len(), 1);
    }

    #[test]
    fn test_shared_storage_delegates() {
        let shared = std::sync::Arc::new(MemoryStorage::new());
        let handle = std::sync::Arc::clone(&shared);
        tokio_test::block_on(async {
            handle.set_state("u", "s").await.unwrap();
            assert_eq!(handle.get_state("u").await.unwrap(), "s");
        });
        assert_eq!(shared.len(), 1);
    }

    #[tokio::test]
    async fn test_close_drops_everything() {
        let store = MemoryStorage::new();
        store.set_state("a", "x").await.unwrap();
        store.set_state("b", "y").await.unwrap();
        assert_eq!(store.len(), 2);
        store.close().await.unwrap();
        assert!(store.is_empty());
    }
}
