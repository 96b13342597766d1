//! Chunker - split structured page content into token-bounded chunks.
//!
//! Sections are accumulated whole while the running estimate stays within
//! `max_tokens`. A section that cannot fit on its own is cut into pieces at
//! sentence punctuation, then at spaces, and only as a last resort at the
//! character budget.

use std::sync::Arc;

use tracing::debug;

use crate::types::{
    chunk::{Chunk, ChunkBoundary},
    config::ChunkerConfig,
    page::{PageContent, PageMetadata},
};

/// Estimates how many model tokens a text costs.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> usize;
}

/// Fixed 0.25 tokens-per-character heuristic.
///
/// Budget-precision tests must use this estimator, not a real tokenizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEstimator;

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// `ceil(chars * 0.25)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

const SECTION_SEPARATOR: &str = "\n\n";

/// Splits pages into chunks.
#[derive(Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    estimator: Arc<dyn TokenEstimator>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

impl Chunker {
    /// Create a chunker using the heuristic estimator.
    pub fn new(config: ChunkerConfig) -> Self {
        Self {
            config,
            estimator: Arc::new(HeuristicEstimator),
        }
    }

    /// Replace the token estimator.
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split `content` into chunks in document order.
    ///
    /// Empty content yields no chunks.
    pub fn chunk(&self, content: &PageContent, metadata: &PageMetadata) -> Vec<Chunk> {
        if content.is_empty() {
            return Vec::new();
        }

        let max_tokens = self.config.max_tokens;
        let mut chunks: Vec<Chunk> = Vec::new();

        let mut builder = ChunkBuilder::default();
        if self.config.include_metadata {
            let preamble = format_preamble(content, metadata);
            // A preamble that eats most of the budget is left out.
            if !preamble.is_empty() && self.estimator.estimate(&preamble) <= max_tokens / 2 {
                builder = ChunkBuilder::with_preamble(preamble);
            }
        }

        for section in &content.sections {
            let text = section.format();
            if text.trim().is_empty() {
                continue;
            }

            if self.estimator.estimate(&builder.candidate(&text)) <= max_tokens {
                builder.push(&text);
                continue;
            }

            let pending = std::mem::take(&mut builder);
            let mut rest = text.as_str();
            if pending.is_preamble_only() {
                // The preamble never travels alone: it takes the head of this
                // section, cut to whatever budget the preamble leaves.
                let budget = self
                    .config
                    .max_chars()
                    .saturating_sub(pending.char_count() + SECTION_SEPARATOR.len());
                let (piece, boundary, remainder) = next_piece(rest, budget);
                let mut head = pending;
                head.push(piece);
                let boundary = match boundary {
                    ChunkBoundary::Tail => ChunkBoundary::Sections,
                    other => other,
                };
                chunks.push(head.finish(chunks.len(), boundary, self.estimator.as_ref()));
                rest = remainder;
                if rest.is_empty() {
                    continue;
                }
            } else if !pending.is_empty() {
                chunks.push(pending.finish(
                    chunks.len(),
                    ChunkBoundary::Sections,
                    self.estimator.as_ref(),
                ));
            }

            if self.estimator.estimate(rest) > max_tokens {
                let pieces = split_oversized(rest, self.config.max_chars());
                debug!(
                    heading = %section.heading,
                    pieces = pieces.len(),
                    "Split oversized section"
                );
                for (piece, boundary) in pieces {
                    chunks.push(Chunk {
                        index: chunks.len(),
                        char_count: piece.chars().count(),
                        token_count: self.estimator.estimate(&piece),
                        text: piece,
                        section_count: 1,
                        has_metadata: false,
                        boundary,
                    });
                }
            } else {
                builder.push(rest);
            }
        }

        if !builder.is_empty() {
            chunks.push(builder.finish(
                chunks.len(),
                ChunkBoundary::Sections,
                self.estimator.as_ref(),
            ));
        }

        debug!(
            chunks = chunks.len(),
            sections = content.sections.len(),
            "Chunked page"
        );
        chunks
    }
}

/// Accumulates section text until finalized into an immutable [`Chunk`].
#[derive(Debug, Default)]
struct ChunkBuilder {
    text: String,
    section_count: usize,
    has_metadata: bool,
}

impl ChunkBuilder {
    fn with_preamble(preamble: String) -> Self {
        Self {
            text: preamble,
            section_count: 0,
            has_metadata: true,
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Holds the metadata preamble and no page text yet.
    fn is_preamble_only(&self) -> bool {
        self.has_metadata && self.section_count == 0
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// The text this builder would hold after pushing `section`.
    fn candidate(&self, section: &str) -> String {
        if self.text.is_empty() {
            section.to_string()
        } else {
            format!("{}{}{}", self.text, SECTION_SEPARATOR, section)
        }
    }

    fn push(&mut self, section: &str) {
        if !self.text.is_empty() {
            self.text.push_str(SECTION_SEPARATOR);
        }
        self.text.push_str(section);
        self.section_count += 1;
    }

    fn finish(
        self,
        index: usize,
        boundary: ChunkBoundary,
        estimator: &dyn TokenEstimator,
    ) -> Chunk {
        Chunk {
            index,
            char_count: self.text.chars().count(),
            token_count: estimator.estimate(&self.text),
            text: self.text,
            section_count: self.section_count,
            has_metadata: self.has_metadata,
            boundary,
        }
    }
}

/// Title/author/date/url lines for the first chunk.
fn format_preamble(content: &PageContent, metadata: &PageMetadata) -> String {
    let fields = [
        ("Title", Some(content.title.as_str())),
        ("Author", metadata.author.as_deref()),
        ("Published", metadata.published.as_deref()),
        ("URL", Some(content.url.as_str())),
    ];

    fields
        .iter()
        .filter_map(|(label, value)| {
            let value = value.map(str::trim).filter(|v| !v.is_empty())?;
            Some(format!("{}: {}", label, value))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` into pieces of at most `max_chars` characters.
///
/// Each cut prefers the last sentence end (`.`, `!` or `?` followed by a
/// space or newline) within the budget, then the last whitespace, then the
/// budget boundary itself.
pub fn split_oversized(text: &str, max_chars: usize) -> Vec<(String, ChunkBoundary)> {
    let mut pieces = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let (piece, boundary, remainder) = next_piece(rest, max_chars);
        if !piece.is_empty() {
            pieces.push((piece.to_string(), boundary));
        }
        rest = remainder;
    }

    pieces
}

/// Cut the leading piece of at most `max_chars` characters off `text`.
///
/// Returns the piece, how it was cut, and the trimmed remainder.
fn next_piece(text: &str, max_chars: usize) -> (&str, ChunkBoundary, &str) {
    let text = text.trim();
    let Some((limit, _)) = text.char_indices().nth(max_chars.max(1)) else {
        return (text, ChunkBoundary::Tail, "");
    };

    let (cut, boundary) = if let Some(cut) = sentence_cut(text, limit) {
        (cut, ChunkBoundary::Sentence)
    } else if let Some(cut) = text[..limit].rfind(char::is_whitespace).filter(|&i| i > 0) {
        (cut, ChunkBoundary::Word)
    } else {
        (limit, ChunkBoundary::Hard)
    };

    (text[..cut].trim_end(), boundary, text[cut..].trim_start())
}

/// Byte offset just past the last sentence-ending punctuation that starts
/// before `limit` and is followed by a space or newline.
fn sentence_cut(text: &str, limit: usize) -> Option<usize> {
    let mut cut = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if i >= limit {
            break;
        }
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(_, next)) = chars.peek() {
                if next == ' ' || next == '\n' {
                    cut = Some(i + c.len_utf8());
                }
            }
        }
    }

    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::page::{Section, SectionLevel};
    use proptest::prelude::*;

    fn chunker(max_tokens: usize) -> Chunker {
        Chunker::new(ChunkerConfig {
            max_tokens,
            include_metadata: false,
        })
    }

    fn paragraph_section(heading: &str, text: &str) -> Section {
        Section::new(heading, SectionLevel::H2).with_block("p", text)
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(2000)), 500);
    }

    #[test]
    fn test_empty_content_yields_no_chunks() {
        let page = PageContent::new("Empty", "https://a.com")
            .with_section(Section::new("", SectionLevel::Root));

        let chunks = Chunker::default().chunk(&page, &PageMetadata::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_short_page_is_single_chunk() {
        let text = "A sentence about the topic. ".repeat(43); // ~1200 chars
        let page = PageContent::from_text("Title", "https://a.com/article", &text);

        let chunks = Chunker::default().chunk(&page, &PageMetadata::default());

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].has_metadata);
        assert!(chunks[0].text.starts_with("Title: Title\nURL: https://a.com/article"));
        assert!(chunks[0].token_count <= 500);
        assert_eq!(chunks[0].boundary, ChunkBoundary::Sections);
    }

    #[test]
    fn test_sections_accumulate_until_budget() {
        // Each section formats to 4 + 2 + 40 = 46 chars ("## A\n\n" + text)
        let text = "x".repeat(40);
        let page = PageContent::new("T", "u")
            .with_section(paragraph_section("A", &text))
            .with_section(paragraph_section("B", &text))
            .with_section(paragraph_section("C", &text));

        // 100 chars budget fits two sections (46 + 2 + 46 = 94) but not three
        let chunks = chunker(25).chunk(&page, &PageMetadata::default());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_count, 2);
        assert_eq!(chunks[1].section_count, 1);
        assert!(chunks[1].text.starts_with("## C"));
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn test_oversized_section_finalizes_pending_and_splits() {
        let long = "One sentence here. ".repeat(20); // 380 chars
        let page = PageContent::new("T", "u")
            .with_section(paragraph_section("Intro", "Short intro."))
            .with_section(paragraph_section("Body", &long))
            .with_section(paragraph_section("End", "Short end."));

        let chunks = chunker(25).chunk(&page, &PageMetadata::default());

        assert!(chunks.len() >= 4);
        assert!(chunks[0].text.contains("Short intro."));
        assert!(!chunks[0].text.contains("One sentence"));
        assert!(chunks[1].boundary.is_split());
        assert!(chunks.last().unwrap().text.contains("Short end."));
        for chunk in &chunks {
            assert!(chunk.token_count <= 25, "chunk {} over budget", chunk.index);
        }
    }

    #[test]
    fn test_split_prefers_sentence_boundary() {
        let text = "First sentence is here. Second sentence is a bit longer than that.";
        let pieces = split_oversized(text, 40);

        assert_eq!(pieces[0].0, "First sentence is here.");
        assert_eq!(pieces[0].1, ChunkBoundary::Sentence);
    }

    #[test]
    fn test_split_falls_back_to_space_then_hard_cut() {
        let pieces = split_oversized("alpha beta gamma delta", 12);
        assert_eq!(pieces[0], ("alpha beta".to_string(), ChunkBoundary::Word));

        let pieces = split_oversized(&"z".repeat(25), 10);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].1, ChunkBoundary::Hard);
        assert_eq!(pieces[0].0.len(), 10);
        assert_eq!(pieces[2], ("z".repeat(5), ChunkBoundary::Tail));
    }

    #[test]
    fn test_split_ignores_decimal_points() {
        let pieces = split_oversized("Pi is 3.14159 roughly speaking ok", 20);
        assert_eq!(pieces[0].1, ChunkBoundary::Word);
    }

    #[test]
    fn test_split_handles_multibyte_text() {
        let text = "Überraschung für alle. ".repeat(10);
        let pieces = split_oversized(&text, 30);
        assert!(pieces.iter().all(|(p, _)| p.chars().count() <= 30));
    }

    #[test]
    fn test_metadata_preamble_fields() {
        let page = PageContent::from_text("Headline", "https://news.example.com/a", "Body text.");
        let metadata = PageMetadata::default()
            .with_author("Jane Reporter")
            .with_published("2024-03-01");

        let chunks = Chunker::default().chunk(&page, &metadata);

        assert_eq!(
            chunks[0].text,
            "Title: Headline\nAuthor: Jane Reporter\nPublished: 2024-03-01\nURL: https://news.example.com/a\n\nBody text."
        );
        assert!(chunks[0].has_metadata);
    }

    #[test]
    fn test_long_plain_text_page_starts_with_page_text() {
        let sentence = "The harbour reopened after the storm damage was repaired. ";
        let page = PageContent::from_text("Title", "https://a.test/x", &sentence.repeat(60));

        let chunks = Chunker::default().chunk(&page, &PageMetadata::default());

        assert_eq!(chunks.len(), 2);
        let first = &chunks[0];
        assert!(first.has_metadata);
        assert_eq!(first.section_count, 1);
        assert!(first.text.starts_with("Title: Title\nURL: https://a.test/x\n\nThe harbour"));
        assert_eq!(first.boundary, ChunkBoundary::Sentence);
        assert!(first.token_count <= 500);
        assert!(!chunks[1].has_metadata);
        assert!(chunks[1].text.starts_with("The harbour"));
    }

    #[test]
    fn test_preamble_joins_section_that_only_fits_alone() {
        // The 92-char section fits a 25-token chunk alone, but not after the preamble
        let text = "Short words fill this line. ".repeat(3);
        let page = PageContent::new("T", "https://a.test")
            .with_section(paragraph_section("Only", text.trim()));

        let chunks = Chunker::new(ChunkerConfig {
            max_tokens: 25,
            include_metadata: true,
        })
        .chunk(&page, &PageMetadata::default());

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.starts_with("Title: T\nURL: https://a.test\n\n## Only"));
        assert_eq!(chunks[0].section_count, 1);
        assert!(chunks.iter().all(|c| c.token_count <= 25));
        assert!(chunks.iter().skip(1).all(|c| !c.has_metadata));
    }

    #[test]
    fn test_custom_estimator() {
        struct WordEstimator;
        impl TokenEstimator for WordEstimator {
            fn estimate(&self, text: &str) -> usize {
                text.split_whitespace().count()
            }
        }

        let page = PageContent::from_text("T", "u", "one two three");
        let chunks = chunker(500)
            .with_estimator(Arc::new(WordEstimator))
            .chunk(&page, &PageMetadata::default());

        assert_eq!(chunks[0].token_count, 3);
    }

    fn sentence() -> impl Strategy<Value = String> {
        "[A-Za-z]{1,10}( [a-z]{1,10}){0,8}[.!?]"
    }

    fn paragraph() -> impl Strategy<Value = String> {
        prop::collection::vec(sentence(), 1..20).prop_map(|s| s.join(" "))
    }

    proptest! {
        #[test]
        fn prop_chunks_respect_budget(
            paragraphs in prop::collection::vec(paragraph(), 1..8),
            max_tokens in 20usize..200,
        ) {
            let text = paragraphs.join("\n\n");
            let page = PageContent::from_text("Title", "https://a.com", &text);
            let chunks = Chunker::new(ChunkerConfig { max_tokens, include_metadata: true })
                .chunk(&page, &PageMetadata::default());

            prop_assert!(!chunks.is_empty());
            for chunk in &chunks {
                prop_assert!(chunk.token_count <= max_tokens);
            }
        }

        #[test]
        fn prop_split_keeps_sentences_whole(
            sentences in prop::collection::vec(sentence(), 2..30),
            max_chars in 120usize..400,
        ) {
            // Every generated sentence is shorter than the budget, so a
            // sentence boundary always exists within it.
            let text = sentences.join(" ");
            for (piece, boundary) in split_oversized(&text, max_chars) {
                prop_assert!(piece.chars().count() <= max_chars);
                prop_assert!(
                    matches!(boundary, ChunkBoundary::Sentence | ChunkBoundary::Tail),
                    "unexpected {:?} cut", boundary
                );
                prop_assert!(piece.ends_with(['.', '!', '?']));
            }
        }
    }
}
