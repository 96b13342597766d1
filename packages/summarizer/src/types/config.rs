//! Configuration types for the summarization pipeline.
//!
//! Every struct deserializes with defaults for missing fields, so a partial
//! JSON config file only needs the values it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::retry::RetryPolicy;
use crate::types::summary::SummaryLength;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub chunker: ChunkerConfig,
    pub prioritizer: PrioritizerConfig,
    pub dispatch: DispatchConfig,
    pub merge: MergeConfig,
    pub cache: CacheConfig,
    pub fallback: FallbackConfig,
}

impl SummarizerConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the chunk token budget.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.chunker.max_tokens = max_tokens;
        self
    }

    /// Set the dispatch configuration.
    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Set the cache configuration.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Set the processing budget (high-priority chunks per page).
    pub fn with_processing_budget(mut self, budget: usize) -> Self {
        self.prioritizer.processing_budget = budget;
        self
    }
}

/// Chunker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Token budget per chunk. Default: 500 (~2000 chars).
    pub max_tokens: usize,

    /// Prefix the first chunk with title/author/date/url.
    pub include_metadata: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            include_metadata: true,
        }
    }
}

impl ChunkerConfig {
    /// Character budget matching `max_tokens` under the 0.25 tokens/char heuristic.
    pub fn max_chars(&self) -> usize {
        self.max_tokens * 4
    }
}

/// Prioritizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritizerConfig {
    /// Maximum non-metadata chunks processed per page. Default: 12.
    pub processing_budget: usize,
}

impl Default for PrioritizerConfig {
    fn default() -> Self {
        Self {
            processing_budget: 12,
        }
    }
}

/// Batch dispatch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Concurrent requests per batch. Default: 3.
    pub batch_size: usize,

    /// Pause between batches in milliseconds. Default: 1000.
    pub inter_batch_delay_ms: u64,

    /// Per-call timeout in milliseconds. Default: 30000.
    pub request_timeout_ms: u64,

    pub retry: RetryPolicy,

    /// Sentences kept by the extractive fallback. Default: 3.
    pub fallback_sentences: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            inter_batch_delay_ms: 1000,
            request_timeout_ms: 30_000,
            retry: RetryPolicy::default(),
            fallback_sentences: 3,
        }
    }
}

impl DispatchConfig {
    /// Set batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set inter-batch delay.
    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Merger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Jaccard similarity at or above which a sentence is a near-duplicate.
    pub similarity_threshold: f64,

    pub short_words: usize,
    pub medium_words: usize,
    pub long_words: usize,

    /// Share of the word budget under which one sentence may overflow it.
    pub overflow_ratio: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            short_words: 100,
            medium_words: 300,
            long_words: 500,
            overflow_ratio: 0.7,
        }
    }
}

impl MergeConfig {
    /// Word budget for a length tier.
    pub fn word_budget(&self, length: SummaryLength) -> usize {
        match length {
            SummaryLength::Short => self.short_words,
            SummaryLength::Medium => self.medium_words,
            SummaryLength::Long => self.long_words,
        }
    }
}

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in milliseconds. Default: 24h.
    pub expiry_ms: i64,

    /// Maximum entries kept after cleanup. Default: 100.
    pub max_entries: usize,

    /// Key prefix inside the shared persistent store.
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiry_ms: 24 * 60 * 60 * 1000,
            max_entries: 100,
            key_prefix: "summary_cache_".to_string(),
        }
    }
}

impl CacheConfig {
    /// Set the maximum entry count.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the expiry.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry_ms = expiry.as_millis() as i64;
        self
    }
}

/// Settings for the single-pass fallback and multi-tab requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Characters of page text sent in the single-pass fallback. Default: 12000.
    pub max_chars: usize,

    /// Pages summarized concurrently by `summarize_tabs`. Default: 3.
    pub tab_concurrency: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            max_chars: 12_000,
            tab_concurrency: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{"dispatch": {"batch_size": 5}, "cache": {"max_entries": 10}}"#;
        let config: SummarizerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.dispatch.batch_size, 5);
        assert_eq!(config.dispatch.inter_batch_delay_ms, 1000);
        assert_eq!(config.cache.max_entries, 10);
        assert_eq!(config.chunker.max_tokens, 500);
        assert_eq!(config.chunker.max_chars(), 2000);
    }

    #[test]
    fn test_word_budget() {
        let merge = MergeConfig::default();
        assert_eq!(merge.word_budget(SummaryLength::Short), 100);
        assert_eq!(merge.word_budget(SummaryLength::Medium), 300);
        assert_eq!(merge.word_budget(SummaryLength::Long), 500);
    }
}
