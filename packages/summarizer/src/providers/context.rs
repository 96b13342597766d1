//! Background context from public lookup APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::ContextError;
use crate::traits::context::{BackgroundContext, ContextProvider};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RELATED_TOPICS: usize = 5;

fn http_error(e: reqwest::Error) -> ContextError {
    ContextError::Http(Box::new(e))
}

/// DuckDuckGo instant-answer lookup.
#[derive(Clone)]
pub struct DuckDuckGoContext {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RelatedTopic {
    #[serde(default)]
    text: Option<String>,
    /// Grouped topics carry nested entries instead of text
    #[serde(default)]
    topics: Vec<RelatedTopic>,
}

impl Default for DuckDuckGoContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DuckDuckGoContext {
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
            base_url: "https://api.duckduckgo.com/".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn instant_answer_context(answer: InstantAnswer) -> Option<BackgroundContext> {
    let topics = answer
        .related_topics
        .iter()
        .flat_map(|t| std::iter::once(t).chain(t.topics.iter()))
        .filter_map(|t| t.text.as_deref())
        .filter(|t| !t.trim().is_empty())
        .take(MAX_RELATED_TOPICS);

    let mut context = BackgroundContext::new(answer.abstract_text.trim());
    for topic in topics {
        context = context.with_topic(topic);
    }
    if !answer.abstract_url.is_empty() {
        context = context.with_source(answer.abstract_url);
    }

    (!context.is_empty()).then_some(context)
}

#[async_trait]
impl ContextProvider for DuckDuckGoContext {
    async fn fetch(&self, query: &str) -> Result<Option<BackgroundContext>, ContextError> {
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .map_err(|e| ContextError::Decode(e.to_string()))?;

        let response = self
            .http_client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?;

        let answer: InstantAnswer = response
            .json()
            .await
            .map_err(|e| ContextError::Decode(e.to_string()))?;

        let context = instant_answer_context(answer);
        debug!(query, found = context.is_some(), "DuckDuckGo lookup");
        Ok(context)
    }
}

/// Wikipedia page-summary lookup.
#[derive(Clone)]
pub struct WikipediaContext {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct WikiSummary {
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<WikiUrls>,
    #[serde(default, rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct WikiUrls {
    desktop: Option<WikiPageUrl>,
}

#[derive(Debug, Deserialize)]
struct WikiPageUrl {
    page: String,
}

impl Default for WikipediaContext {
    fn default() -> Self {
        Self::new("en")
    }
}

impl WikipediaContext {
    /// Lookup against the Wikipedia of `language` (e.g. "en").
    pub fn new(language: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: format!("https://{}.wikipedia.org/api/rest_v1/page/summary/", language),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn summary_url(&self, query: &str) -> Result<Url, ContextError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ContextError::Decode(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ContextError::Decode("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .push(&query.trim().replace(' ', "_"));
        Ok(url)
    }
}

fn wiki_context(summary: WikiSummary) -> Option<BackgroundContext> {
    if summary.kind == "disambiguation" || summary.extract.trim().is_empty() {
        return None;
    }

    let mut context = BackgroundContext::new(summary.extract.trim());
    if let Some(page) = summary.content_urls.and_then(|u| u.desktop) {
        context = context.with_source(page.page);
    }
    Some(context)
}

#[async_trait]
impl ContextProvider for WikipediaContext {
    async fn fetch(&self, query: &str) -> Result<Option<BackgroundContext>, ContextError> {
        if query.trim().is_empty() {
            return Ok(None);
        }

        let response = self
            .http_client
            .get(self.summary_url(query)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(http_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(query, "No Wikipedia page");
            return Ok(None);
        }

        let summary: WikiSummary = response
            .error_for_status()
            .map_err(http_error)?
            .json()
            .await
            .map_err(|e| ContextError::Decode(e.to_string()))?;

        Ok(wiki_context(summary))
    }
}

/// Tries providers in order; the first non-empty context wins.
///
/// A failing provider is logged and skipped.
#[derive(Default)]
pub struct ContextChain {
    providers: Vec<Box<dyn ContextProvider>>,
}

impl ContextChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl ContextProvider for ContextChain {
    async fn fetch(&self, query: &str) -> Result<Option<BackgroundContext>, ContextError> {
        for (i, provider) in self.providers.iter().enumerate() {
            match provider.fetch(query).await {
                Ok(Some(context)) if !context.is_empty() => return Ok(Some(context)),
                Ok(_) => {}
                Err(e) => warn!(provider = i, error = %e, "Context provider failed"),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockContextProvider;

    #[test]
    fn test_instant_answer_flattens_grouped_topics() {
        let json = r#"{
            "AbstractText": "Rust is a programming language.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust",
            "RelatedTopics": [
                {"Text": "Cargo - package manager", "FirstURL": "https://x"},
                {"Name": "Group", "Topics": [{"Text": "Ferris - mascot"}]}
            ]
        }"#;

        let answer: InstantAnswer = serde_json::from_str(json).unwrap();
        let context = instant_answer_context(answer).unwrap();

        assert_eq!(context.abstract_text, "Rust is a programming language.");
        assert_eq!(context.related_topics, vec!["Cargo - package manager", "Ferris - mascot"]);
        assert_eq!(context.sources, vec!["https://en.wikipedia.org/wiki/Rust"]);
    }

    #[test]
    fn test_empty_instant_answer_is_absent() {
        let answer: InstantAnswer = serde_json::from_str(r#"{"AbstractText": ""}"#).unwrap();
        assert!(instant_answer_context(answer).is_none());
    }

    #[test]
    fn test_wiki_disambiguation_is_absent() {
        let summary: WikiSummary =
            serde_json::from_str(r#"{"type": "disambiguation", "extract": "Mercury may refer to:"}"#)
                .unwrap();
        assert!(wiki_context(summary).is_none());
    }

    #[test]
    fn test_wiki_summary_url_encodes_title() {
        let url = WikipediaContext::default().summary_url("Rust (language)").unwrap();
        assert_eq!(
            url.as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/Rust_(language)"
        );
    }

    #[tokio::test]
    async fn test_chain_skips_failures_and_empties() {
        let chain = ContextChain::new()
            .with_provider(MockContextProvider::failing())
            .with_provider(MockContextProvider::empty())
            .with_provider(MockContextProvider::new(BackgroundContext::new("Found it.")));

        let context = chain.fetch("anything").await.unwrap().unwrap();
        assert_eq!(context.abstract_text, "Found it.");
    }
}
