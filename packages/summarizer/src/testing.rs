//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the summarizer
//! without making real LLM or network calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{CacheError, CacheResult, ContextError, ExtractionError, GenerationError, GenerationResult};
use crate::traits::{
    clock::Clock,
    context::{BackgroundContext, ContextProvider},
    generator::TextGenerator,
    source::ContentSource,
    store::PersistentStore,
};
use crate::types::page::{PageContent, PageMetadata};

/// Marker after which every prompt carries the chunk text.
const CONTENT_MARKER: &str = "\nContent:\n";

#[derive(Debug, Clone)]
enum Behavior {
    Respond(String),
    Fail(GenerationError),
    /// Fail this many more times, then fall through to later rules
    FailTimes(usize, GenerationError),
}

/// Record of a call made to the mock generator.
#[derive(Debug, Clone, PartialEq)]
pub struct MockGeneratorCall {
    pub prompt: String,
    pub max_output_tokens: usize,
}

/// A mock text generator for testing.
///
/// Rules are keyed by a substring of the prompt and checked in insertion
/// order. Without a matching rule the mock echoes the first sentence of the
/// prompt's content section, so output is deterministic and traceable to
/// its chunk.
#[derive(Default, Clone)]
pub struct MockGenerator {
    rules: Arc<RwLock<Vec<(String, Behavior)>>>,

    latencies: Arc<RwLock<Vec<(String, Duration)>>>,

    /// Error returned for every call without a matching rule
    default_error: Option<GenerationError>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockGeneratorCall>>>,
}

impl MockGenerator {
    /// Create a mock that echoes content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails every unmatched call with `error`.
    pub fn failing(error: GenerationError) -> Self {
        Self {
            default_error: Some(error),
            ..Default::default()
        }
    }

    /// Respond with `response` when the prompt contains `needle`.
    pub fn with_response(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules
            .write()
            .unwrap()
            .push((needle.into(), Behavior::Respond(response.into())));
        self
    }

    /// Fail with `error` whenever the prompt contains `needle`.
    pub fn with_error(self, needle: impl Into<String>, error: GenerationError) -> Self {
        self.rules
            .write()
            .unwrap()
            .push((needle.into(), Behavior::Fail(error)));
        self
    }

    /// Fail the first `times` calls whose prompt contains `needle`.
    pub fn with_error_times(
        self,
        needle: impl Into<String>,
        error: GenerationError,
        times: usize,
    ) -> Self {
        self.rules
            .write()
            .unwrap()
            .push((needle.into(), Behavior::FailTimes(times, error)));
        self
    }

    /// Delay calls whose prompt contains `needle`.
    pub fn with_latency(self, needle: impl Into<String>, latency: Duration) -> Self {
        self.latencies
            .write()
            .unwrap()
            .push((needle.into(), latency));
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockGeneratorCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Number of calls whose prompt contains `needle`.
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn respond(&self, prompt: &str) -> GenerationResult<String> {
        let mut rules = self.rules.write().unwrap();
        for (needle, behavior) in rules.iter_mut() {
            if !prompt.contains(needle.as_str()) {
                continue;
            }
            match behavior {
                Behavior::Respond(response) => return Ok(response.clone()),
                Behavior::Fail(error) => return Err(error.clone()),
                Behavior::FailTimes(remaining, error) if *remaining > 0 => {
                    *remaining -= 1;
                    return Err(error.clone());
                }
                Behavior::FailTimes(..) => {}
            }
        }

        match &self.default_error {
            Some(error) => Err(error.clone()),
            None => Ok(echo_first_sentence(prompt)),
        }
    }
}

/// First sentence of the text after the last `Content:` line of a prompt
/// (or of the whole prompt when there is none).
pub fn echo_first_sentence(prompt: &str) -> String {
    let content = prompt
        .rfind(CONTENT_MARKER)
        .map_or(prompt, |i| &prompt[i + CONTENT_MARKER.len()..]);

    crate::pipeline::extractive::sentences(content)
        .into_iter()
        .next()
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, max_output_tokens: usize) -> GenerationResult<String> {
        self.calls.write().unwrap().push(MockGeneratorCall {
            prompt: prompt.to_string(),
            max_output_tokens,
        });

        let latency = self
            .latencies
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, latency)| *latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.respond(prompt)
    }
}

/// A mock context provider.
#[derive(Clone, Default)]
pub struct MockContextProvider {
    context: Option<BackgroundContext>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockContextProvider {
    /// Always returns `context`.
    pub fn new(context: BackgroundContext) -> Self {
        Self {
            context: Some(context),
            ..Default::default()
        }
    }

    /// Never finds anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextProvider for MockContextProvider {
    async fn fetch(&self, _query: &str) -> Result<Option<BackgroundContext>, ContextError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ContextError::Decode("mock failure".to_string()));
        }
        Ok(self.context.clone())
    }
}

/// A mock content source serving predefined pages by handle.
#[derive(Default)]
pub struct MockSource {
    pages: HashMap<String, (PageContent, PageMetadata)>,
    failures: HashMap<String, String>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `content` for `handle`.
    pub fn with_page(
        mut self,
        handle: impl Into<String>,
        content: PageContent,
        metadata: PageMetadata,
    ) -> Self {
        self.pages.insert(handle.into(), (content, metadata));
        self
    }

    /// Fail extraction of `handle` with `message`.
    pub fn with_failure(mut self, handle: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(handle.into(), message.into());
        self
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn extract(&self, handle: &str) -> Result<(PageContent, PageMetadata), ExtractionError> {
        if let Some(message) = self.failures.get(handle) {
            return Err(ExtractionError::Failed(message.clone().into()));
        }

        self.pages
            .get(handle)
            .cloned()
            .ok_or_else(|| ExtractionError::NotFound {
                handle: handle.to_string(),
            })
    }
}

/// A persistent store where every operation fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingStore;

fn store_down() -> CacheError {
    CacheError::Backend("store unavailable".into())
}

#[async_trait]
impl PersistentStore for FailingStore {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(store_down())
    }

    async fn set(&self, _key: &str, _value: Vec<u8>) -> CacheResult<()> {
        Err(store_down())
    }

    async fn remove(&self, _keys: &[String]) -> CacheResult<()> {
        Err(store_down())
    }

    async fn get_all(&self) -> CacheResult<IndexMap<String, Vec<u8>>> {
        Err(store_down())
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_first_sentence() {
        assert_eq!(
            echo_first_sentence("Instructions. More.\n\nContent:\nFirst one. Second one."),
            "First one."
        );
        assert_eq!(echo_first_sentence("No marker here. At all."), "No marker here.");
        assert_eq!(echo_first_sentence("Intro.\nContent:\n"), "");
    }

    #[tokio::test]
    async fn test_error_times_then_echo() {
        let mock = MockGenerator::new().with_error_times(
            "flaky",
            GenerationError::Transient("503".into()),
            1,
        );

        assert!(mock.generate("flaky prompt.", 10).await.is_err());
        assert_eq!(mock.generate("flaky prompt.", 10).await.unwrap(), "flaky prompt.");
        assert_eq!(mock.call_count(), 2);
    }
}
