//! Page classifier - choose a content type from URL, title, body and
//! metadata signals.
//!
//! Each rule gets an additive score. Candidates with a positive score are
//! ranked by `(priority desc, score desc)`; the first whose confidence
//! (`min(score / 10, 1)`) exceeds its rule's threshold wins. When none
//! qualifies the page is generic, reported with the top candidate's
//! confidence.
//!
//! Selection walks down the ranking rather than checking only the top
//! entry: a high-priority rule that misses its threshold does not hide a
//! lower-priority rule that clears its own. A single top-entry check would
//! report `generic` in that case.

mod rules;

pub use rules::{ClassifierRules, ContentRule, StructuralCue};

use std::cmp::Ordering;

use indexmap::IndexMap;
use tracing::debug;

use crate::types::{
    classification::{ClassificationResult, ContentType},
    page::PageData,
};

/// Indicator occurrences counted per keyword in body text.
const MAX_CONTENT_MATCHES: usize = 3;
const CONTENT_MATCH_WEIGHT: f32 = 0.5;

/// Classifies pages against an injected rule table.
#[derive(Debug, Clone, Default)]
pub struct PageClassifier {
    rules: ClassifierRules,
}

/// Lowercased views of a page, computed once per call.
struct Signals<'a> {
    url: String,
    title: String,
    title_raw: &'a str,
    body: String,
    body_raw: String,
    description: String,
    author: Option<&'a str>,
}

impl<'a> Signals<'a> {
    fn new(page: &'a PageData) -> Self {
        let body_raw = page.text();

        Self {
            url: page.url.to_lowercase(),
            title: page.title.to_lowercase(),
            title_raw: &page.title,
            body: body_raw.to_lowercase(),
            body_raw,
            description: page
                .metadata
                .description
                .as_deref()
                .unwrap_or_default()
                .to_lowercase(),
            author: page.metadata.author.as_deref(),
        }
    }
}

impl PageClassifier {
    /// Create a classifier with the given rules.
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClassifierRules {
        &self.rules
    }

    /// Classify a page. Identical input always yields identical output.
    pub fn classify(&self, page: &PageData) -> ClassificationResult {
        let signals = Signals::new(page);

        let mut scores = IndexMap::with_capacity(self.rules.rules().len());
        let mut reasoning = Vec::new();

        for rule in self.rules.rules() {
            let score = score_rule(rule, &signals, &mut reasoning);
            scores.insert(rule.content_type, score);
        }

        let mut ranked: Vec<&ContentRule> = self
            .rules
            .rules()
            .iter()
            .filter(|r| scores[&r.content_type] > 0.0)
            .collect();

        ranked.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then_with(|| {
                scores[&b.content_type]
                    .partial_cmp(&scores[&a.content_type])
                    .unwrap_or(Ordering::Equal)
            })
        });

        let Some(top) = ranked.first() else {
            reasoning.push("no signals matched; using generic".to_string());
            return ClassificationResult {
                content_type: ContentType::Generic,
                confidence: 0.0,
                scores,
                reasoning,
            };
        };

        let accepted = ranked.iter().find(|rule| {
            let confidence = confidence(scores[&rule.content_type]);
            if confidence > rule.threshold {
                true
            } else {
                reasoning.push(format!(
                    "{}: confidence {:.2} does not exceed threshold {:.2}",
                    rule.content_type, confidence, rule.threshold
                ));
                false
            }
        });

        let (content_type, confidence) = match accepted {
            Some(rule) => (rule.content_type, confidence(scores[&rule.content_type])),
            None => {
                reasoning.push("no candidate cleared its threshold; using generic".to_string());
                (ContentType::Generic, confidence(scores[&top.content_type]))
            }
        };

        debug!(
            url = %page.url,
            content_type = %content_type,
            confidence,
            "Classified page"
        );

        ClassificationResult {
            content_type,
            confidence,
            scores,
            reasoning,
        }
    }
}

fn confidence(score: f32) -> f32 {
    (score / 10.0).min(1.0)
}

fn score_rule(rule: &ContentRule, signals: &Signals<'_>, reasoning: &mut Vec<String>) -> f32 {
    let label = rule.content_type;
    let mut score = 0.0;

    for pattern in &rule.url_patterns {
        if pattern.is_match(&signals.url) {
            score += 3.0;
            reasoning.push(format!("{}: url matches /{}/ (+3)", label, pattern.as_str()));
        }
    }

    for pattern in &rule.title_patterns {
        if pattern.is_match(signals.title_raw) {
            score += 2.0;
            reasoning.push(format!("{}: title matches /{}/ (+2)", label, pattern.as_str()));
        }
    }

    for indicator in &rule.indicators {
        let indicator = indicator.as_str();

        if signals.url.contains(indicator) {
            score += 2.0;
            reasoning.push(format!("{}: url contains \"{}\" (+2)", label, indicator));
        }

        if signals.title.contains(indicator) {
            score += 1.0;
            reasoning.push(format!("{}: title contains \"{}\" (+1)", label, indicator));
        }

        let hits = signals
            .body
            .matches(indicator)
            .take(MAX_CONTENT_MATCHES)
            .count();
        if hits > 0 {
            score += hits as f32 * CONTENT_MATCH_WEIGHT;
        }

        if signals.description.contains(indicator) {
            score += 1.0;
            reasoning.push(format!("{}: description contains \"{}\" (+1)", label, indicator));
        }
    }

    for cue in &rule.structural {
        if cue.pattern.is_match(&signals.body_raw) {
            score += cue.bonus;
            reasoning.push(format!("{}: {} in content (+{})", label, cue.label, cue.bonus));
        }
    }

    if let Some(author) = signals.author {
        if rule.author_patterns.iter().any(|p| p.is_match(author)) {
            score += 2.0;
            reasoning.push(format!("{}: author looks like a journalist (+2)", label));
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::page::PageMetadata;

    fn classify(url: &str, title: &str, content: &str) -> ClassificationResult {
        PageClassifier::default().classify(&PageData::new(title, url, content))
    }

    #[test]
    fn test_video_interview_page() {
        let result = classify(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "Exclusive interview with the director",
            "Uploaded by the channel. 1.2M views",
        );

        assert_eq!(result.content_type, ContentType::Video);
        assert!(result.confidence > 0.5);
        assert!(!result.is_generic());
    }

    #[test]
    fn test_wikipedia_page_is_reference() {
        let result = classify(
            "https://en.wikipedia.org/wiki/Rust_(programming_language)",
            "Rust (programming language) - Wikipedia",
            "Rust is a general-purpose programming language.[1] It was designed for performance.[2]\n\nSee also\n\nReferences",
        );

        assert_eq!(result.content_type, ContentType::Reference);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_news_article_with_journalist_author() {
        let page = PageData::new(
            "Breaking: council approves budget",
            "https://www.example-times.com/news/2024/03/01/budget",
            "By Jane Smith\nThe council approved the budget, according to officials.",
        )
        .with_metadata(PageMetadata::default().with_author("Jane Smith, staff writer"));

        let result = PageClassifier::default().classify(&page);

        assert_eq!(result.content_type, ContentType::News);
        assert!(result.reasoning.iter().any(|r| r.contains("journalist")));
    }

    #[test]
    fn test_no_signals_is_generic() {
        let result = classify("https://example.com/", "Hello", "Plain words only.");

        assert_eq!(result.content_type, ContentType::Generic);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.scores.len(), 8);
    }

    #[test]
    fn test_weak_signal_falls_back_to_generic() {
        // One body mention of "video" scores 0.5, confidence 0.05
        let result = classify("https://example.com/page", "Notes", "There is a video here.");

        assert_eq!(result.content_type, ContentType::Generic);
        assert!(result.confidence > 0.0);
        assert!(result.score(ContentType::Video) > 0.0);
    }

    #[test]
    fn test_priority_breaks_ties_but_threshold_still_applies() {
        let rules = ClassifierRules::new(vec![
            ContentRule::new(ContentType::Blog, 1, 0.1).with_indicators(&["alpha"]),
            ContentRule::new(ContentType::Forum, 9, 0.9).with_indicators(&["alpha"]),
        ])
        .unwrap();

        let result = PageClassifier::new(rules)
            .classify(&PageData::new("alpha", "https://alpha.test", "alpha"));

        // Both score 2 + 1 + 0.5; forum ranks first but misses its threshold
        assert_eq!(result.score(ContentType::Forum), 3.5);
        assert_eq!(result.content_type, ContentType::Blog);
    }

    #[test]
    fn test_deterministic() {
        let page = PageData::new(
            "Getting started - API documentation",
            "https://docs.example.com/api/start",
            "Install with `cargo add example`.\n\n```\nfn main() {}\n```",
        );
        let classifier = PageClassifier::default();

        let first = classifier.classify(&page);
        for _ in 0..5 {
            assert_eq!(classifier.classify(&page), first);
        }
        assert_eq!(first.content_type, ContentType::Documentation);
    }

    #[test]
    fn test_uses_sections_when_content_empty() {
        let mut page = PageData::new("Widget", "https://shop.test/item/1", "");
        page.sections = vec![crate::types::page::Section::new(
            "",
            crate::types::page::SectionLevel::Root,
        )
        .with_block("p", "Price $19.99. Add to cart. In stock.")];

        let result = PageClassifier::default().classify(&page);
        assert_eq!(result.content_type, ContentType::Product);
    }
}
