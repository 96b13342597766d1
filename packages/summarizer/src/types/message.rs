//! Boundary messages exchanged with the caller (e.g. an extension router).
//!
//! The string-keyed wire form (`{"action": "...", "payload": {...}}`) exists
//! only at serialization; inside the crate requests are a closed enum.

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::types::{
    classification::ClassificationResult,
    page::PageData,
    summary::{SummarizeResponse, SummaryLength, TabOutcome},
};

/// An operation requested by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum Request {
    /// Summarize one page
    Summarize {
        page: PageData,
        #[serde(default)]
        length: SummaryLength,
    },

    /// Summarize several open tabs
    SummarizeTabs {
        pages: Vec<PageData>,
        #[serde(default)]
        length: SummaryLength,
    },

    /// Classify a page without summarizing
    Classify { page: PageData },

    /// Report cache size
    CacheStats,

    /// Evict expired and overflow entries
    CleanupCache,

    /// Drop every cache entry
    ClearCache,
}

impl Request {
    /// Parse a request from its wire form.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum Response {
    Summary(SummarizeResponse),

    Tabs { results: Vec<TabOutcome> },

    Classification(ClassificationResult),

    CacheStats(CacheStats),

    /// Number of entries removed
    CacheCleaned { evicted: usize },

    /// Explicit error; the caller never waits on a missing reply
    Error { error: String },
}

impl Response {
    /// Serialize to the wire form.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
