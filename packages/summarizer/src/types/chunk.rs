//! Chunk types - token-bounded slices of page text.

use serde::{Deserialize, Serialize};

/// How a chunk's text was delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkBoundary {
    /// One or more whole sections
    Sections,
    /// Piece of an oversized section, cut after sentence punctuation
    Sentence,
    /// Piece of an oversized section, cut at a space
    Word,
    /// Piece of an oversized section, cut at the character budget
    Hard,
    /// Last piece of an oversized section
    Tail,
}

impl ChunkBoundary {
    /// Whether this chunk came out of an oversized section.
    pub fn is_split(self) -> bool {
        !matches!(self, Self::Sections)
    }
}

/// A contiguous slice of page text prepared for independent summarization.
///
/// Immutable once produced by the chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Position in document order, starting at 0
    pub index: usize,

    pub text: String,

    pub char_count: usize,

    /// Estimated tokens (see `TokenEstimator`)
    pub token_count: usize,

    /// Number of sections that contributed text
    pub section_count: usize,

    /// Whether the text starts with the page metadata preamble
    pub has_metadata: bool,

    pub boundary: ChunkBoundary,
}

impl Chunk {
    /// Whether the chunk text is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A chunk with its importance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,

    pub importance_score: f64,
}

impl PrioritizedChunk {
    /// Wrap a chunk with a score.
    pub fn new(chunk: Chunk, importance_score: f64) -> Self {
        Self {
            chunk,
            importance_score,
        }
    }

    /// The original chunk index.
    pub fn index(&self) -> usize {
        self.chunk.index
    }
}
