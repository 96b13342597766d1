//! Adaptive Page Summarization Library
//!
//! Turns the structured text of a web page into a summary of a requested
//! length while staying inside the request quota of an external text
//! generator.
//!
//! # Design Philosophy
//!
//! - Classify first, so the prompt fits the page (news, reference, video, ...)
//! - Summarize the most informative chunks, not all of them
//! - Recover per chunk (extractive fallback), then per page (single pass)
//! - Cache by content fingerprint; context lookups only run on a miss
//! - Library handles mechanics, the app supplies the collaborators
//!
//! # Usage
//!
//! ```rust,ignore
//! use summarizer::{MemoryStore, PageData, Summarizer, SummarizerConfig, SummaryLength};
//! use summarizer::testing::MockGenerator;
//!
//! let summarizer = Summarizer::new(MockGenerator::new(), MemoryStore::new(), SummarizerConfig::default());
//!
//! let page = PageData::new("Title", "https://example.com/article", text);
//! let response = summarizer.summarize(&page, SummaryLength::Short).await?;
//! assert!(!response.cached);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator seams (TextGenerator, ContentSource, ContextProvider, PersistentStore, Clock)
//! - [`types`] - Pages, chunks, classifications, summaries, config and boundary messages
//! - [`pipeline`] - Classifier, chunker, prioritizer, dispatcher, merger and the [`Summarizer`]
//! - [`cache`] - Fingerprints and the summary cache
//! - [`stores`] - Persistent store implementations (MemoryStore, SqliteStore)
//! - [`providers`] - HTTP generator and context providers
//! - [`testing`] - Mock implementations for testing

pub mod cache;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use cache::{fingerprint, CacheStats, CacheStore};
pub use error::{
    CacheError, ContextError, ExtractionError, GenerationError, Result, SummarizeError,
};
pub use pipeline::{
    ClassifierRules, ContentRule, PageClassifier, RetryPolicy, Summarizer, TokenEstimator,
};
pub use stores::MemoryStore;
#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;
pub use traits::{
    clock::{Clock, SystemClock},
    context::{BackgroundContext, ContextProvider},
    generator::TextGenerator,
    source::ContentSource,
    store::PersistentStore,
};
pub use types::{
    chunk::{Chunk, ChunkBoundary, PrioritizedChunk},
    classification::{ClassificationResult, ContentType},
    config::{
        CacheConfig, ChunkerConfig, DispatchConfig, FallbackConfig, MergeConfig,
        PrioritizerConfig, SummarizerConfig,
    },
    message::{Request, Response},
    page::{ContentBlock, PageContent, PageData, PageMetadata, Section, SectionLevel},
    summary::{
        BatchResult, CacheEntry, SummarizeResponse, SummaryLength, SummaryStats, TabOutcome,
    },
};
