//! Background context lookup.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// Background information about a topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundContext {
    /// Short abstract of the topic
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    #[serde(default)]
    pub related_topics: Vec<String>,

    /// Where the abstract came from
    #[serde(default)]
    pub sources: Vec<String>,
}

impl BackgroundContext {
    /// Create context from an abstract.
    pub fn new(abstract_text: impl Into<String>) -> Self {
        Self {
            abstract_text: abstract_text.into(),
            ..Default::default()
        }
    }

    /// Add a related topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.related_topics.push(topic.into());
        self
    }

    /// Add a source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.abstract_text.trim().is_empty() && self.related_topics.is_empty()
    }

    /// Render as a prompt section.
    pub fn to_prompt_text(&self) -> String {
        let mut text = self.abstract_text.trim().to_string();
        if !self.related_topics.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str("Related: ");
            text.push_str(&self.related_topics.join("; "));
        }
        text
    }
}

/// Best-effort enrichment (encyclopedia or instant-answer lookups).
///
/// `Ok(None)` means nothing was found; errors are logged by the caller and
/// treated the same way.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<Option<BackgroundContext>, ContextError>;
}
