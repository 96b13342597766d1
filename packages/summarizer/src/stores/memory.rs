//! In-memory storage implementation for testing and development.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{CacheError, CacheResult};
use crate::traits::store::PersistentStore;

/// In-memory key/value storage.
///
/// Keeps insertion order, so enumeration is deterministic. Not suitable for
/// production as data is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<IndexMap<String, Vec<u8>>>,
}

fn poisoned<T>(_: PoisonError<T>) -> CacheError {
    CacheError::Backend("memory store lock poisoned".into())
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.read().map(|v| v.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.values.read().map_err(poisoned)?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()> {
        self.values
            .write()
            .map_err(poisoned)?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> CacheResult<()> {
        let mut values = self.values.write().map_err(poisoned)?;
        for key in keys {
            values.shift_remove(key);
        }
        Ok(())
    }

    async fn get_all(&self) -> CacheResult<IndexMap<String, Vec<u8>>> {
        Ok(self.values.read().map_err(poisoned)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set("a", b"1".to_vec()).await.unwrap();
        store.set("b", b"2".to_vec()).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.len(), 2);

        store
            .remove(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_all_keeps_insertion_order() {
        let store = MemoryStore::new();
        for key in ["c", "a", "b"] {
            store.set(key, Vec::new()).await.unwrap();
        }
        store.remove(&["a".to_string()]).await.unwrap();
        store.set("c", b"updated".to_vec()).await.unwrap();

        let keys: Vec<String> = store.get_all().await.unwrap().into_keys().collect();
        assert_eq!(keys, vec!["c", "b"]);
    }
}
