//! The Summarizer - main entry point of the library.
//!
//! One `summarize` call walks
//! `classify → cache check → (hit: done) | (miss: context → chunk →
//! prioritize → dispatch → merge → store)`.
//!
//! The cache key only uses content-derived fields, so a hit never pays for
//! the context lookup. When the chunked pipeline fails as a whole, a single
//! generic prompt over the truncated page text is tried instead; that result
//! is returned as degraded and never cached.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{self, StreamExt};
use serde_json::json;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cache::{fingerprint, CacheStats, CacheStore};
use crate::error::{Result, SummarizeError};
use crate::pipeline::{
    chunker::{Chunker, TokenEstimator},
    classifier::{ClassifierRules, PageClassifier},
    dispatch::BatchDispatcher,
    merger::{SummaryMerger, NO_SUMMARY},
    prioritizer::ChunkPrioritizer,
    prompts::{chunk_prompt_hash, format_chunk_prompt, format_single_pass_prompt},
};
use crate::traits::{
    clock::Clock, context::ContextProvider, generator::TextGenerator, source::ContentSource,
    store::PersistentStore,
};
use crate::types::{
    classification::{ClassificationResult, ContentType},
    config::SummarizerConfig,
    message::{Request, Response},
    page::{PageData, Section, SectionLevel},
    summary::{SummarizeResponse, SummaryLength, SummaryStats, TabOutcome},
};

const COMMENTS_HEADING: &str = "Viewer comments";

type InFlight = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Why the chunked pipeline gave up.
struct PipelineFailure {
    error: SummarizeError,

    /// Merged extractive fallbacks, when any chunk produced one
    extractive: Option<String>,
}

impl PipelineFailure {
    fn new(error: SummarizeError) -> Self {
        Self {
            error,
            extractive: None,
        }
    }
}

/// Holds the in-flight slot for one cache key until dropped.
struct FlightGuard<'a> {
    in_flight: &'a InFlight,
    key: String,
    _slot: OwnedMutexGuard<()>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Two references left means the map and this guard: nobody is waiting.
        if in_flight
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) <= 2)
        {
            in_flight.remove(&self.key);
        }
    }
}

/// Adaptive page summarizer.
///
/// # Example
///
/// ```rust,ignore
/// use summarizer::{MemoryStore, PageData, Summarizer, SummarizerConfig, SummaryLength};
/// use summarizer::providers::OpenAiGenerator;
///
/// let generator = OpenAiGenerator::new(api_key, "gpt-4o-mini");
/// let summarizer = Summarizer::new(generator, MemoryStore::new(), SummarizerConfig::default());
///
/// let page = PageData::new("Title", "https://example.com/a", text);
/// let response = summarizer.summarize(&page, SummaryLength::Short).await?;
/// println!("{}", response.summary);
/// ```
pub struct Summarizer<G: TextGenerator, S: PersistentStore> {
    generator: G,
    cache: CacheStore<S>,
    classifier: PageClassifier,
    chunker: Chunker,
    prioritizer: ChunkPrioritizer,
    dispatcher: BatchDispatcher,
    merger: SummaryMerger,
    context: Option<Box<dyn ContextProvider>>,
    config: SummarizerConfig,
    in_flight: InFlight,
}

impl<G: TextGenerator, S: PersistentStore> Summarizer<G, S> {
    /// Create a summarizer with the builtin classifier rules and no
    /// context provider.
    pub fn new(generator: G, store: S, config: SummarizerConfig) -> Self {
        Self {
            generator,
            cache: CacheStore::new(store, config.cache.clone()),
            classifier: PageClassifier::default(),
            chunker: Chunker::new(config.chunker.clone()),
            prioritizer: ChunkPrioritizer::new(config.prioritizer.clone()),
            dispatcher: BatchDispatcher::new(config.dispatch.clone()),
            merger: SummaryMerger::new(config.merge.clone()),
            context: None,
            config,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the classifier rule table.
    pub fn with_classifier_rules(mut self, rules: ClassifierRules) -> Self {
        self.classifier = PageClassifier::new(rules);
        self
    }

    /// Enrich chunk prompts with background context.
    pub fn with_context_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.context = Some(Box::new(provider));
        self
    }

    /// Replace the token estimator used by the chunker.
    pub fn with_token_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.chunker = self.chunker.with_estimator(estimator);
        self
    }

    /// Replace the clock used for cache expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = self.cache.with_clock(clock);
        self
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn cache(&self) -> &CacheStore<S> {
        &self.cache
    }

    /// Classify a page without summarizing it.
    pub fn classify(&self, page: &PageData) -> ClassificationResult {
        self.classifier.classify(page)
    }

    /// Summarize one page.
    ///
    /// Returns a genuine summary, a cached one, or a degraded single-pass
    /// one. An error only surfaces when the pipeline and the single-pass
    /// fallback both fail with nothing extractive to return.
    #[instrument(
        skip(self, page),
        fields(request_id = %Uuid::new_v4(), url = %page.url, length = %length)
    )]
    pub async fn summarize(
        &self,
        page: &PageData,
        length: SummaryLength,
    ) -> Result<SummarizeResponse> {
        let classification = self.classifier.classify(page);

        if page.is_empty() {
            info!("Page has no text, nothing to summarize");
            return Ok(response(NO_SUMMARY.to_string(), false, false, classification));
        }

        let text = page.text();
        let key = self.cache.key_for(&fingerprint(
            &text,
            &page.title,
            &page.url,
            classification.content_type,
            length,
        ));

        let _flight = self.begin_flight(&key).await;

        if let Some(entry) = self.cache.get(&key).await {
            info!(cache_key = %key, "Cache hit");
            return Ok(response(entry.summary, true, false, classification));
        }

        match self.run_pipeline(page, &classification, length, &key).await {
            Ok(summary) => Ok(response(summary, false, false, classification)),
            Err(failure) => self.fallback(page, &text, length, classification, failure).await,
        }
    }

    /// Summarize several pages, at most `tab_concurrency` at a time.
    ///
    /// Outcomes come back in input order; one failing page never affects
    /// the others.
    pub async fn summarize_tabs(
        &self,
        pages: &[PageData],
        length: SummaryLength,
    ) -> Vec<TabOutcome> {
        info!(tabs = pages.len(), "Summarizing tabs");

        stream::iter(pages)
            .map(|page| async move {
                match self.summarize(page, length).await {
                    Ok(response) => TabOutcome {
                        url: page.url.clone(),
                        response: Some(response),
                        error: None,
                    },
                    Err(e) => {
                        warn!(url = %page.url, error = %e, "Tab summary failed");
                        TabOutcome {
                            url: page.url.clone(),
                            response: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .buffered(self.config.fallback.tab_concurrency.max(1))
            .collect()
            .await
    }

    /// Extract a page from `source` and summarize it.
    pub async fn summarize_source<C: ContentSource + ?Sized>(
        &self,
        source: &C,
        handle: &str,
        length: SummaryLength,
    ) -> Result<SummarizeResponse> {
        let (content, metadata) = source.extract(handle).await?;
        self.summarize(&PageData::from_content(content, metadata), length)
            .await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Evict expired and overflow cache entries.
    pub async fn cleanup_cache(&self) -> usize {
        self.cache.cleanup().await
    }

    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    /// Answer a boundary request. Failures become [`Response::Error`].
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Summarize { page, length } => match self.summarize(&page, length).await {
                Ok(summary) => Response::Summary(summary),
                Err(e) => Response::Error {
                    error: e.to_string(),
                },
            },
            Request::SummarizeTabs { pages, length } => Response::Tabs {
                results: self.summarize_tabs(&pages, length).await,
            },
            Request::Classify { page } => Response::Classification(self.classify(&page)),
            Request::CacheStats => Response::CacheStats(self.cache_stats().await),
            Request::CleanupCache => Response::CacheCleaned {
                evicted: self.cleanup_cache().await,
            },
            Request::ClearCache => Response::CacheCleaned {
                evicted: self.clear_cache().await,
            },
        }
    }

    // =========================================================================
    // Pipeline stages
    // =========================================================================

    /// Wait until no other request is working on `key`.
    async fn begin_flight(&self, key: &str) -> FlightGuard<'_> {
        let slot = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        if slot.try_lock().is_err() {
            debug!(cache_key = %key, "Identical request in flight, waiting");
        }

        FlightGuard {
            in_flight: &self.in_flight,
            key: key.to_string(),
            _slot: slot.lock_owned().await,
        }
    }

    async fn run_pipeline(
        &self,
        page: &PageData,
        classification: &ClassificationResult,
        length: SummaryLength,
        key: &str,
    ) -> std::result::Result<String, PipelineFailure> {
        let content_type = classification.content_type;
        let context = self.fetch_context(&page.title).await;

        let mut content = page.page_content();
        if content_type == ContentType::Video && !page.metadata.comments.is_empty() {
            let comments = page
                .metadata
                .comments
                .iter()
                .fold(Section::new(COMMENTS_HEADING, SectionLevel::Subsection), |s, c| {
                    s.with_block("li", c.as_str())
                });
            content = content.with_section(comments);
        }

        let chunks = self.chunker.chunk(&content, &page.metadata);
        if chunks.is_empty() {
            return Err(PipelineFailure::new(SummarizeError::Merge(
                "page produced no chunks".to_string(),
            )));
        }

        let prioritized = self.prioritizer.prioritize(chunks);
        let total = prioritized.total();
        let budget = self.config.prioritizer.processing_budget
            + usize::from(prioritized.metadata_chunk.is_some());

        let report = self
            .dispatcher
            .dispatch(
                &prioritized.dispatch_order(),
                &self.generator,
                length.max_output_tokens(),
                budget,
                |chunk| {
                    format_chunk_prompt(
                        content_type,
                        length,
                        &page.title,
                        context.as_deref(),
                        &chunk.text,
                    )
                },
            )
            .await;

        let mut summary = self.merger.merge(&report.summaries(), length);

        if report.all_failed() {
            return Err(PipelineFailure {
                error: SummarizeError::AllChunksFailed {
                    failed: report.failure_count(),
                },
                extractive: (summary != NO_SUMMARY).then_some(summary),
            });
        }
        if summary == NO_SUMMARY {
            return Err(PipelineFailure::new(SummarizeError::Merge(
                "no usable chunk summaries".to_string(),
            )));
        }

        let processed = report.results.len();
        if processed < total {
            summary.push_str(&format!(
                "\n\n(Summary covers {} of {} parts of this page.)",
                processed, total
            ));
        }

        let metadata = HashMap::from([
            ("contentType".to_string(), json!(content_type)),
            ("confidence".to_string(), json!(classification.confidence)),
            ("length".to_string(), json!(length)),
            ("chunks".to_string(), json!(total)),
            ("processed".to_string(), json!(processed)),
            ("failed".to_string(), json!(report.failure_count())),
            ("promptHash".to_string(), json!(chunk_prompt_hash())),
            ("url".to_string(), json!(page.url)),
            ("title".to_string(), json!(page.title)),
        ]);
        self.cache.put(key, &summary, metadata).await;

        info!(
            content_type = %content_type,
            chunks = total,
            processed,
            failed = report.failure_count(),
            quota_exhausted = report.quota_exhausted,
            words = SummaryStats::of(&summary).word_count,
            "Summary complete"
        );

        Ok(summary)
    }

    /// Background context as prompt text. Lookup failures count as absent.
    async fn fetch_context(&self, query: &str) -> Option<String> {
        let provider = self.context.as_ref()?;
        if query.trim().is_empty() {
            return None;
        }

        match provider.fetch(query).await {
            Ok(Some(context)) if !context.is_empty() => Some(context.to_prompt_text()),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Context lookup failed, continuing without");
                None
            }
        }
    }

    /// Single-pass summary over the truncated page text. Never cached.
    async fn fallback(
        &self,
        page: &PageData,
        text: &str,
        length: SummaryLength,
        classification: ClassificationResult,
        failure: PipelineFailure,
    ) -> Result<SummarizeResponse> {
        warn!(error = %failure.error, "Pipeline failed, trying single-pass summary");

        let truncated: String = text.chars().take(self.config.fallback.max_chars).collect();
        let prompt = format_single_pass_prompt(length, &page.title, &truncated);

        let outcome = self
            .config
            .dispatch
            .retry
            .run(self.config.dispatch.request_timeout(), |attempt| {
                debug!(attempt, "Generating single-pass summary");
                self.generator.generate(&prompt, length.max_output_tokens())
            })
            .await;

        match outcome.result {
            Ok(summary) if !summary.trim().is_empty() => {
                info!(attempts = outcome.attempts, "Single-pass summary succeeded");
                Ok(response(summary.trim().to_string(), false, true, classification))
            }
            result => {
                let error = match result {
                    Err(e) => {
                        warn!(error = %e, "Single-pass summary failed");
                        SummarizeError::Generation(e)
                    }
                    Ok(_) => failure.error,
                };
                match failure.extractive {
                    Some(extractive) => {
                        info!("Returning extractive summary");
                        Ok(response(extractive, false, true, classification))
                    }
                    None => Err(error),
                }
            }
        }
    }
}

fn response(
    summary: String,
    cached: bool,
    degraded: bool,
    classification: ClassificationResult,
) -> SummarizeResponse {
    SummarizeResponse {
        stats: SummaryStats::of(&summary),
        summary,
        cached,
        degraded,
        classification,
    }
}
