//! Typed errors for the summarization library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Failures are recovered as
//! locally as possible: per chunk (extractive fallback), then per pipeline
//! (single-pass fallback). Only what survives both reaches the caller.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the summarization pipeline.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// Text generation failed and could not be recovered
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The content source could not produce the page
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Every dispatched chunk failed to generate
    #[error("all {failed} dispatched chunks failed")]
    AllChunksFailed { failed: usize },

    /// Merging partial summaries produced nothing usable
    #[error("merge failed: {0}")]
    Merge(String),

    /// Invalid configuration or rule table
    #[error("config error: {0}")]
    Config(String),

    /// JSON (de)serialization error at the message boundary
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Errors returned by a [`TextGenerator`](crate::traits::generator::TextGenerator).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Quota exhausted (rate-limit class). Never retried; stops dispatch.
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },

    /// Temporary failure (network, 5xx). Retried with backoff.
    #[error("transient error: {0}")]
    Transient(String),

    /// Malformed or empty generator output. Permanent for that call.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The call did not finish within the request timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    /// Whether the dispatcher should try this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }

    /// Whether this error signals quota exhaustion.
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Errors from a [`ContentSource`](crate::traits::source::ContentSource).
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No page exists for the handle
    #[error("page not found: {handle}")]
    NotFound { handle: String },

    /// Extraction failed for another reason
    #[error("extraction failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors from a [`PersistentStore`](crate::traits::store::PersistentStore).
///
/// The cache swallows these: a failed read is a miss, a failed write a no-op.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backing store failed
    #[error("storage error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Stored bytes are not a valid cache entry
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from a [`ContextProvider`](crate::traits::context::ContextProvider).
#[derive(Debug, Error)]
pub enum ContextError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

/// Result type alias for summarization operations.
pub type Result<T> = std::result::Result<T, SummarizeError>;

/// Result type alias for generator calls.
pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

/// Result type alias for store operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_classification() {
        let rate = GenerationError::RateLimited { retry_after: None };
        assert!(rate.is_quota_exhausted());
        assert!(!rate.is_retryable());

        assert!(GenerationError::Transient("502".into()).is_retryable());
        assert!(GenerationError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!GenerationError::InvalidResponse("empty".into()).is_retryable());
    }
}
