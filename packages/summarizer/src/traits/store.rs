//! Persistent key/value substrate under the summary cache.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::CacheResult;

/// Keyed byte storage outside process memory (extension storage, SQLite, ...).
///
/// The cache only needs these four operations; failures are logged and
/// treated as a miss or a no-op, never propagated to the caller.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Read one value.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Write one value, replacing any previous one.
    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()>;

    /// Remove several keys. Missing keys are ignored.
    async fn remove(&self, keys: &[String]) -> CacheResult<()>;

    /// Every stored key/value pair.
    async fn get_all(&self) -> CacheResult<IndexMap<String, Vec<u8>>>;
}

#[async_trait]
impl<T: PersistentStore + ?Sized> PersistentStore for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, keys: &[String]) -> CacheResult<()> {
        (**self).remove(keys).await
    }

    async fn get_all(&self) -> CacheResult<IndexMap<String, Vec<u8>>> {
        (**self).get_all().await
    }
}
