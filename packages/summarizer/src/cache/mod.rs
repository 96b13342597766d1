//! Summary cache over a [`PersistentStore`].
//!
//! Keys are content fingerprints. Every store failure is logged and
//! swallowed: a failed read is a miss, a failed write a no-op.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::CacheResult;
use crate::traits::{
    clock::{Clock, SystemClock},
    store::PersistentStore,
};
use crate::types::{
    classification::ContentType, config::CacheConfig, summary::CacheEntry,
    summary::SummaryLength,
};

const FIELD_SEPARATOR: char = '\u{1f}';

/// Fingerprint of the fields that determine a summary.
///
/// Content is whitespace-normalized first; any change to any of the five
/// fields changes the result.
pub fn fingerprint(
    content: &str,
    title: &str,
    url: &str,
    content_type: ContentType,
    length: SummaryLength,
) -> String {
    let normalized = content.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut hasher = Sha256::new();
    for field in [
        normalized.as_str(),
        title.trim(),
        url.trim(),
        content_type.as_str(),
        length.as_str(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update([FIELD_SEPARATOR as u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Cache size report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oldest_timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_timestamp: Option<i64>,
}

/// Fingerprint-keyed summary cache with expiry and a size limit.
pub struct CacheStore<S: PersistentStore> {
    store: S,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl<S: PersistentStore> CacheStore<S> {
    /// Create a cache using the system clock.
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Storage key for a fingerprint.
    pub fn key_for(&self, fingerprint: &str) -> String {
        format!("{}{}", self.config.key_prefix, fingerprint)
    }

    fn is_expired(&self, entry: &CacheEntry, now: i64) -> bool {
        entry.age_ms(now) > self.config.expiry_ms
    }

    /// Look up a live entry. Expired entries are evicted and reported absent.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let entry = match decode(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Corrupt cache entry, treating as miss");
                self.remove(&[key.to_string()]).await;
                return None;
            }
        };

        if self.is_expired(&entry, self.clock.now_ms()) {
            debug!(cache_key = %key, "Cache entry expired");
            self.remove(&[key.to_string()]).await;
            return None;
        }

        Some(entry)
    }

    /// Store a summary, then run [`cleanup`](Self::cleanup).
    pub async fn put(
        &self,
        key: &str,
        summary: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) {
        let entry = CacheEntry {
            key: key.to_string(),
            summary: summary.to_string(),
            metadata,
            timestamp: self.clock.now_ms(),
        };

        match encode(&entry) {
            Ok(bytes) => {
                if let Err(e) = self.store.set(key, bytes).await {
                    warn!(cache_key = %key, error = %e, "Cache write failed");
                }
            }
            Err(e) => warn!(cache_key = %key, error = %e, "Cache entry not serializable"),
        }

        self.cleanup().await;
    }

    /// Evict expired entries, then the oldest until at most `max_entries`
    /// remain. Returns the number evicted.
    pub async fn cleanup(&self) -> usize {
        let entries = self.entries().await;
        let now = self.clock.now_ms();

        let mut evict = Vec::new();
        let mut live = Vec::with_capacity(entries.len());

        for (key, entry) in entries {
            match entry {
                Some(entry) if !self.is_expired(&entry, now) => live.push((key, entry.timestamp)),
                _ => evict.push(key),
            }
        }

        if live.len() > self.config.max_entries {
            // Stable: equal timestamps keep store order
            live.sort_by_key(|(_, timestamp)| *timestamp);
            let overflow = live.len() - self.config.max_entries;
            evict.extend(live.drain(..overflow).map(|(key, _)| key));
        }

        if !evict.is_empty() {
            debug!(evicted = evict.len(), remaining = live.len(), "Cache cleanup");
            self.remove(&evict).await;
        }

        evict.len()
    }

    /// Entry count and timestamp range of live and expired entries alike.
    pub async fn stats(&self) -> CacheStats {
        let timestamps: Vec<i64> = self
            .entries()
            .await
            .into_iter()
            .filter_map(|(_, entry)| entry.map(|e| e.timestamp))
            .collect();

        CacheStats {
            entries: timestamps.len(),
            oldest_timestamp: timestamps.iter().min().copied(),
            newest_timestamp: timestamps.iter().max().copied(),
        }
    }

    /// Remove every cache entry. Returns the number removed.
    pub async fn clear(&self) -> usize {
        let keys: Vec<String> = self.entries().await.into_iter().map(|(key, _)| key).collect();
        if !keys.is_empty() {
            self.remove(&keys).await;
        }
        keys.len()
    }

    /// Every cache-owned key in store order, with its decoded entry
    /// (`None` when undecodable).
    async fn entries(&self) -> Vec<(String, Option<CacheEntry>)> {
        let all = match self.store.get_all().await {
            Ok(all) => all,
            Err(e) => {
                warn!(error = %e, "Cache enumeration failed");
                return Vec::new();
            }
        };

        all.into_iter()
            .filter(|(key, _)| key.starts_with(&self.config.key_prefix))
            .map(|(key, bytes)| {
                let entry = decode(&bytes).ok();
                (key, entry)
            })
            .collect()
    }

    async fn remove(&self, keys: &[String]) {
        if let Err(e) = self.store.remove(keys).await {
            warn!(keys = keys.len(), error = %e, "Cache eviction failed");
        }
    }
}

fn encode(entry: &CacheEntry) -> CacheResult<Vec<u8>> {
    Ok(serde_json::to_vec(entry)?)
}

fn decode(bytes: &[u8]) -> CacheResult<CacheEntry> {
    Ok(serde_json::from_slice(bytes)?)
}
