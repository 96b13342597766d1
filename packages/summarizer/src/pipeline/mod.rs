//! Summarization pipeline.
//!
//! The stages, in the order a page passes through them:
//! - Classification (content type from URL, title and body signals)
//! - Chunking (token-bounded slices in document order)
//! - Prioritization (importance scores under a processing budget)
//! - Dispatch (batched generation with retry and quota handling)
//! - Merging (dedup, word budget, transitions)
//!
//! [`Summarizer`] runs them end to end, with the cache in front.

pub mod chunker;
pub mod classifier;
pub mod dispatch;
pub mod extractive;
pub mod merger;
pub mod orchestrator;
pub mod prioritizer;
pub mod prompts;
pub mod retry;

pub use chunker::{estimate_tokens, split_oversized, Chunker, HeuristicEstimator, TokenEstimator};
pub use classifier::{ClassifierRules, ContentRule, PageClassifier, StructuralCue};
pub use dispatch::{BatchDispatcher, DispatchReport};
pub use extractive::{extractive_summary, score_sentence};
pub use merger::{SummaryMerger, NO_SUMMARY};
pub use orchestrator::Summarizer;
pub use prioritizer::{score_chunk, ChunkPrioritizer, Prioritized};
pub use prompts::{
    chunk_prompt_hash, format_chunk_prompt, format_single_pass_prompt, CHUNK_PROMPT,
};
pub use retry::{RetryOutcome, RetryPolicy};
