//! Classification types - content-type labels and classifier output.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Content-type label selecting a prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    News,
    Reference,
    Video,
    Academic,
    Documentation,
    Product,
    Forum,
    Blog,
    Generic,
}

impl ContentType {
    /// Stable label used in cache keys and prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Reference => "reference",
            Self::Video => "video",
            Self::Academic => "academic",
            Self::Documentation => "documentation",
            Self::Product => "product",
            Self::Forum => "forum",
            Self::Blog => "blog",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of page classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Chosen content type (generic when no rule clears its threshold)
    #[serde(rename = "type")]
    pub content_type: ContentType,

    /// Confidence in [0, 1], `min(top_score / 10, 1)`
    pub confidence: f32,

    /// Score per rule, in rule-table order
    pub scores: IndexMap<ContentType, f32>,

    /// Human-readable trace of the signals that fired
    pub reasoning: Vec<String>,
}

impl ClassificationResult {
    /// A generic classification with no signals.
    pub fn generic() -> Self {
        Self {
            content_type: ContentType::Generic,
            confidence: 0.0,
            scores: IndexMap::new(),
            reasoning: Vec::new(),
        }
    }

    /// Score recorded for a type (0 when absent).
    pub fn score(&self, content_type: ContentType) -> f32 {
        self.scores.get(&content_type).copied().unwrap_or(0.0)
    }

    /// Whether the classifier fell back to the generic type.
    pub fn is_generic(&self) -> bool {
        self.content_type == ContentType::Generic
    }
}
