//! Chunk prioritizer - rank chunks by estimated information value.
//!
//! Score = token count, plus bonuses for structure and factual density,
//! minus a large penalty per boilerplate marker.

use std::cmp::Ordering;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::types::{
    chunk::{Chunk, PrioritizedChunk},
    config::PrioritizerConfig,
};

const LIST_BONUS: f64 = 30.0;
const TABLE_BONUS: f64 = 30.0;
const FORMATTING_BONUS: f64 = 20.0;

const YEAR_WEIGHT: f64 = 5.0;
const YEAR_CAP: f64 = 50.0;
const PERCENT_WEIGHT: f64 = 5.0;
const PERCENT_CAP: f64 = 50.0;
const KEYWORD_WEIGHT: f64 = 3.0;
const KEYWORD_CAP: f64 = 30.0;

/// Pushes a boilerplate chunk below any realistic content chunk.
const BOILERPLATE_PENALTY: f64 = 1000.0;

/// Words that tend to mark substantive, factual text.
const DOMAIN_KEYWORDS: &[&str] = &[
    "research",
    "study",
    "data",
    "results",
    "analysis",
    "evidence",
    "according to",
    "announced",
    "percent",
    "million",
    "billion",
    "government",
    "company",
    "important",
    "significant",
    "because",
];

lazy_static! {
    static ref LIST_MARKER: Regex = Regex::new(r"(?m)^\s*(?:[-*•]|\d+[.)])\s+\S").unwrap();
    static ref TABLE_MARKER: Regex = Regex::new(r"(?m)^\|.*\|$").unwrap();
    static ref FORMATTING_MARKER: Regex = Regex::new(r"(?m)^#{1,3} \S|\*\*[^*]+\*\*").unwrap();
    static ref YEAR: Regex = Regex::new(r"\b(?:1[5-9]|20)\d{2}\b").unwrap();
    static ref PERCENTAGE: Regex = Regex::new(r"\d+(?:\.\d+)?\s?%|\bper ?cent\b").unwrap();
    static ref BOILERPLATE: Regex = Regex::new(
        r"(?im)^(?:#{1,3} )?(?:navigation|main menu|skip to content|references|external links|see also|further reading|categories|category:|notes)\s*$"
    )
    .unwrap();
}

/// Output of [`ChunkPrioritizer::prioritize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prioritized {
    /// The chunk carrying the metadata preamble, processed first
    pub metadata_chunk: Option<Chunk>,

    /// Highest-scoring chunks, at most the processing budget, best first
    pub high_priority: Vec<PrioritizedChunk>,

    /// Everything past the budget; not dispatched
    pub low_priority: Vec<PrioritizedChunk>,
}

impl Prioritized {
    /// Chunks to dispatch: metadata chunk first, then high priority.
    pub fn dispatch_order(&self) -> Vec<Chunk> {
        self.metadata_chunk
            .iter()
            .cloned()
            .chain(self.high_priority.iter().map(|p| p.chunk.clone()))
            .collect()
    }

    /// Total chunk count, dispatched or not.
    pub fn total(&self) -> usize {
        usize::from(self.metadata_chunk.is_some()) + self.high_priority.len() + self.low_priority.len()
    }
}

/// Ranks chunks under a fixed processing budget.
#[derive(Debug, Clone, Default)]
pub struct ChunkPrioritizer {
    config: PrioritizerConfig,
}

impl ChunkPrioritizer {
    pub fn new(config: PrioritizerConfig) -> Self {
        Self { config }
    }

    /// Separate the metadata chunk, score the rest and split at the budget.
    ///
    /// Sorting is stable: equal scores keep document order.
    pub fn prioritize(&self, chunks: Vec<Chunk>) -> Prioritized {
        let mut metadata_chunk = None;
        let mut scored = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            if chunk.has_metadata && metadata_chunk.is_none() {
                metadata_chunk = Some(chunk);
                continue;
            }
            let score = score_chunk(&chunk.text, chunk.token_count);
            scored.push(PrioritizedChunk::new(chunk, score));
        }

        scored.sort_by(|a, b| {
            b.importance_score
                .partial_cmp(&a.importance_score)
                .unwrap_or(Ordering::Equal)
        });

        let budget = self.config.processing_budget.min(scored.len());
        let low_priority = scored.split_off(budget);

        debug!(
            high = scored.len(),
            low = low_priority.len(),
            has_metadata = metadata_chunk.is_some(),
            "Prioritized chunks"
        );

        Prioritized {
            metadata_chunk,
            high_priority: scored,
            low_priority,
        }
    }
}

/// Importance score of one chunk.
pub fn score_chunk(text: &str, token_count: usize) -> f64 {
    let mut score = token_count as f64;

    if LIST_MARKER.is_match(text) {
        score += LIST_BONUS;
    }
    if TABLE_MARKER.is_match(text) {
        score += TABLE_BONUS;
    }
    if FORMATTING_MARKER.is_match(text) {
        score += FORMATTING_BONUS;
    }

    score += (YEAR.find_iter(text).count() as f64 * YEAR_WEIGHT).min(YEAR_CAP);
    score += (PERCENTAGE.find_iter(text).count() as f64 * PERCENT_WEIGHT).min(PERCENT_CAP);

    let lower = text.to_lowercase();
    let keywords = DOMAIN_KEYWORDS
        .iter()
        .map(|k| lower.matches(k).count())
        .sum::<usize>();
    score += (keywords as f64 * KEYWORD_WEIGHT).min(KEYWORD_CAP);

    score -= BOILERPLATE.find_iter(text).count() as f64 * BOILERPLATE_PENALTY;

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::chunk::ChunkBoundary;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            char_count: text.chars().count(),
            token_count: text.chars().count().div_ceil(4),
            section_count: 1,
            has_metadata: false,
            boundary: ChunkBoundary::Sections,
        }
    }

    #[test]
    fn test_factual_density_outranks_filler() {
        let filler = chunk(0, "Some words that say very little at all here.");
        let facts = chunk(1, "In 2023 revenue grew 15% to 3 million.");

        let result = ChunkPrioritizer::default().prioritize(vec![filler, facts]);
        assert_eq!(result.high_priority[0].index(), 1);
    }

    #[test]
    fn test_boilerplate_is_demoted_below_budget() {
        let chunks = vec![
            chunk(0, "## See also\n\n- Other page\n- Another page"),
            chunk(1, "Real content about the topic."),
            chunk(2, "More real content."),
        ];

        let result = ChunkPrioritizer::new(PrioritizerConfig {
            processing_budget: 2,
        })
        .prioritize(chunks);

        assert_eq!(result.high_priority.len(), 2);
        assert_eq!(result.low_priority.len(), 1);
        assert_eq!(result.low_priority[0].index(), 0);
        assert!(result.low_priority[0].importance_score < 0.0);
    }

    #[test]
    fn test_metadata_chunk_separated() {
        let mut meta = chunk(0, "Title: T\nURL: u\n\nBody");
        meta.has_metadata = true;

        let result = ChunkPrioritizer::default().prioritize(vec![meta, chunk(1, "Other.")]);

        assert_eq!(result.metadata_chunk.as_ref().map(|c| c.index), Some(0));
        assert_eq!(result.high_priority.len(), 1);
        assert_eq!(result.total(), 2);

        let order: Vec<usize> = result.dispatch_order().iter().map(|c| c.index).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn test_ties_keep_document_order() {
        let chunks = (0..4).map(|i| chunk(i, "same text")).collect();
        let result = ChunkPrioritizer::default().prioritize(chunks);

        let order: Vec<usize> = result.high_priority.iter().map(|c| c.index()).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_bonuses_are_capped() {
        let years = (1990..2030).map(|y| y.to_string()).collect::<Vec<_>>().join(" ");
        let base = years.chars().count().div_ceil(4) as f64;
        assert_eq!(score_chunk(&years, years.chars().count().div_ceil(4)), base + YEAR_CAP);
    }

    #[test]
    fn test_structure_bonus() {
        let list = "- first item\n- second item";
        let table = "| a |\n| b |";
        assert_eq!(score_chunk(list, 0), LIST_BONUS);
        assert_eq!(score_chunk(table, 0), TABLE_BONUS);
    }
}
