//! Summary merger - stitch partial summaries into one text.
//!
//! Sentences are deduplicated (exact after normalization, then Jaccard
//! word-set similarity), cut to a word budget and joined with a transition
//! phrase wherever the source summary changes.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::pipeline::extractive::sentences;
use crate::types::{config::MergeConfig, summary::SummaryLength};

/// Returned when there is nothing to merge.
pub const NO_SUMMARY: &str = "No summary available.";

const TRANSITIONS: &[&str] = &["Additionally, ", "Furthermore, ", "Moreover, "];

/// Sentence openers that read naturally in lowercase after a transition.
const LOWERCASE_OPENERS: &[&str] = &[
    "A", "An", "The", "This", "That", "These", "Those", "It", "Its", "They", "There", "In", "On",
    "At", "For", "With", "As", "Some", "Many", "Most", "Several", "Each", "Both",
];

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref SPACE_BEFORE_PUNCT: Regex = Regex::new(r"\s+([.,;:!?])").unwrap();
    // A lowercase word end before a capitalized word, so "U.S." and "Node.JS" stay intact
    static ref MISSING_SPACE: Regex = Regex::new(r"([a-z]{2,}[.!?])([A-Z][a-z])").unwrap();
}

/// A kept sentence and the summary it came from.
#[derive(Debug)]
struct Tagged<'a> {
    source: usize,
    text: &'a str,
    words: HashSet<String>,
}

/// Merges ordered partial summaries.
#[derive(Debug, Clone, Default)]
pub struct SummaryMerger {
    config: MergeConfig,
}

impl SummaryMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Merge `summaries` (in chunk order) for the requested length.
    pub fn merge(&self, summaries: &[String], length: SummaryLength) -> String {
        let summaries = distinct_summaries(summaries);

        match summaries.as_slice() {
            [] => return NO_SUMMARY.to_string(),
            [single] => return clean(single),
            _ => {}
        }

        let budget = self.config.word_budget(length);
        let overflow_limit = budget as f64 * self.config.overflow_ratio;

        let mut seen = HashSet::new();
        let mut kept: Vec<Tagged<'_>> = Vec::new();
        let mut word_total = 0;
        let mut dropped = 0;

        'sources: for (source, summary) in summaries.iter().enumerate() {
            for sentence in sentences(summary) {
                let normalized = normalize(sentence);
                if normalized.is_empty() || !seen.insert(normalized.clone()) {
                    dropped += 1;
                    continue;
                }

                let words: HashSet<String> =
                    normalized.split(' ').map(str::to_string).collect();
                if kept
                    .iter()
                    .any(|k| jaccard(&k.words, &words) >= self.config.similarity_threshold)
                {
                    dropped += 1;
                    continue;
                }

                let count = sentence.split_whitespace().count();
                if word_total + count > budget {
                    // One sentence may overflow a budget that is still mostly empty
                    if (word_total as f64) < overflow_limit {
                        kept.push(Tagged {
                            source,
                            text: sentence,
                            words,
                        });
                        word_total += count;
                    }
                    break 'sources;
                }

                kept.push(Tagged {
                    source,
                    text: sentence,
                    words,
                });
                word_total += count;
            }
        }

        debug!(
            sources = summaries.len(),
            kept = kept.len(),
            dropped,
            words = word_total,
            budget,
            "Merged summaries"
        );

        if kept.is_empty() {
            return NO_SUMMARY.to_string();
        }

        clean(&join_with_transitions(&kept))
    }
}

/// Non-blank summaries with exact repeats (after normalization) removed.
fn distinct_summaries(summaries: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    summaries
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && seen.insert(normalize(s)))
        .collect()
}

fn join_with_transitions(kept: &[Tagged<'_>]) -> String {
    let mut out = String::new();
    let mut transitions = TRANSITIONS.iter().cycle();

    for (i, sentence) in kept.iter().enumerate() {
        if i == 0 {
            out.push_str(sentence.text);
            continue;
        }

        out.push(' ');
        if sentence.source != kept[i - 1].source {
            if let Some(transition) = transitions.next() {
                out.push_str(transition);
            }
            out.push_str(&lowercase_opener(sentence.text));
        } else {
            out.push_str(sentence.text);
        }
    }

    out
}

/// Lowercase the first word when it is a common opener.
fn lowercase_opener(sentence: &str) -> String {
    let first = sentence.split_whitespace().next().unwrap_or_default();
    if LOWERCASE_OPENERS.contains(&first) {
        let mut chars = sentence.chars();
        match chars.next() {
            Some(c) => c.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        sentence.to_string()
    }
}

/// Lowercase, strip punctuation, collapse whitespace.
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaccard similarity of two word sets. Two empty sets are identical.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Collapse whitespace and fix spacing around punctuation.
pub fn clean(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = MISSING_SPACE.replace_all(&text, "$1 $2");
    text.trim().to_string()
}
