//! Summary types - length tiers, per-chunk results, cache entries and the
//! response returned to callers.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::classification::ClassificationResult;

/// Requested summary length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    /// Stable label used in cache keys and prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }

    /// Token ceiling passed to the generator.
    pub fn max_output_tokens(self) -> usize {
        match self {
            Self::Short => 256,
            Self::Medium => 512,
            Self::Long => 1024,
        }
    }
}

impl fmt::Display for SummaryLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SummaryLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            other => Err(format!("unknown summary length: {}", other)),
        }
    }
}

/// Outcome of dispatching one chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// Original chunk index, used to restore document order
    pub chunk_index: usize,

    /// Generated summary, or the extractive fallback on failure
    pub summary: String,

    pub success: bool,

    /// Generator calls made for this chunk
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchResult {
    /// A successful generation.
    pub fn success(chunk_index: usize, summary: impl Into<String>, attempts: u32) -> Self {
        Self {
            chunk_index,
            summary: summary.into(),
            success: true,
            attempts,
            error: None,
        }
    }

    /// A failed generation carrying its fallback text.
    pub fn failure(
        chunk_index: usize,
        fallback: impl Into<String>,
        attempts: u32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            chunk_index,
            summary: fallback.into(),
            success: false,
            attempts,
            error: Some(error.into()),
        }
    }
}

/// A cached final summary keyed by content fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,

    pub summary: String,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Write time, epoch milliseconds
    pub timestamp: i64,
}

impl CacheEntry {
    /// Age relative to `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }
}

/// Size statistics of a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub word_count: usize,
    pub char_count: usize,
}

impl SummaryStats {
    /// Compute stats for a text.
    pub fn of(text: &str) -> Self {
        Self {
            word_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
        }
    }
}

/// Response of the public `summarize` entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResponse {
    pub summary: String,

    /// Served from cache
    pub cached: bool,

    /// Produced by the single-pass fallback (never cached)
    #[serde(default)]
    pub degraded: bool,

    pub classification: ClassificationResult,

    pub stats: SummaryStats,
}

/// Outcome for one page of a multi-tab request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabOutcome {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<SummarizeResponse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_parse() {
        assert_eq!("Short".parse::<SummaryLength>(), Ok(SummaryLength::Short));
        assert_eq!("long".parse::<SummaryLength>(), Ok(SummaryLength::Long));
        assert!("tiny".parse::<SummaryLength>().is_err());
    }

    #[test]
    fn test_stats() {
        let stats = SummaryStats::of("Grass is green.  The sky is blue.");
        assert_eq!(stats.word_count, 7);
        assert_eq!(stats.char_count, 33);
    }
}
