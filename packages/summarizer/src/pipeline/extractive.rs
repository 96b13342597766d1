//! Extractive fallback - a heuristic mini-summary used when generation for a
//! chunk fails.
//!
//! Sentences are scored on named-entity-like capitalization, years,
//! currency/percentage figures and a fixed keyword list. The best are kept
//! in their original order.

use lazy_static::lazy_static;
use regex::Regex;

const KEYWORDS: &[&str] = &[
    "important",
    "significant",
    "announced",
    "according to",
    "found",
    "result",
    "because",
    "first",
    "new",
    "key",
    "main",
    "conclusion",
];

/// Sentences shorter than this carry too little to be worth keeping.
const MIN_SENTENCE_CHARS: usize = 20;

lazy_static! {
    // Punctuation only ends a sentence when whitespace or the end follows,
    // so decimals and domain names stay intact.
    static ref SENTENCE: Regex = Regex::new(r"(?s).+?(?:[.!?]+(?:\s+|$)|$)").unwrap();
    static ref NAMED_ENTITY: Regex = Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b").unwrap();
    static ref YEAR: Regex = Regex::new(r"\b(?:1[5-9]|20)\d{2}\b").unwrap();
    static ref FIGURE: Regex =
        Regex::new(r"[$€£]\s?\d[\d,]*(?:\.\d+)?|\d+(?:\.\d+)?\s?%").unwrap();
}

/// Split text into trimmed sentences.
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    SENTENCE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Heuristic score of a sentence.
pub fn score_sentence(sentence: &str) -> usize {
    let lower = sentence.to_lowercase();

    2 * NAMED_ENTITY.find_iter(sentence).count()
        + 2 * YEAR.find_iter(sentence).count()
        + 2 * FIGURE.find_iter(sentence).count()
        + KEYWORDS.iter().filter(|k| lower.contains(*k)).count()
}

/// The `max_sentences` highest-scoring sentences of `text`, in original order.
///
/// Ties prefer earlier sentences. Falls back to the leading sentences when
/// nothing scores, and to the trimmed text when it has no sentence structure.
pub fn extractive_summary(text: &str, max_sentences: usize) -> String {
    let text = text.trim();
    if text.is_empty() || max_sentences == 0 {
        return String::new();
    }

    let candidates: Vec<(usize, &str)> = sentences(text)
        .into_iter()
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS && !s.starts_with(['#', '|']))
        .enumerate()
        .collect();

    if candidates.is_empty() {
        return text.chars().take(300).collect::<String>().trim().to_string();
    }

    let mut ranked: Vec<(usize, usize)> = candidates
        .iter()
        .map(|(i, s)| (*i, score_sentence(s)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut keep: Vec<usize> = ranked.iter().take(max_sentences).map(|(i, _)| *i).collect();
    keep.sort_unstable();

    keep.iter()
        .map(|&i| candidates[i].1)
        .collect::<Vec<_>>()
        .join(" ")
}
