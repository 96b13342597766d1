//! Batch dispatcher - run chunk prompts through the generator in fixed-size
//! concurrent batches.
//!
//! Each chunk retries under the configured [`RetryPolicy`](super::retry::RetryPolicy).
//! A quota error is never retried and stops scheduling of further batches;
//! requests already in flight in the current batch still resolve and are
//! kept. A failed chunk is replaced by its extractive fallback.

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::pipeline::extractive::extractive_summary;
use crate::traits::generator::TextGenerator;
use crate::types::{chunk::Chunk, config::DispatchConfig, summary::BatchResult};

/// Outcome of a dispatch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// One result per dispatched chunk, sorted by chunk index
    pub results: Vec<BatchResult>,

    /// A quota error was seen
    pub quota_exhausted: bool,

    /// Chunks never dispatched because the loop stopped early
    pub skipped: usize,

    /// Batches started
    pub batches: usize,
}

impl DispatchReport {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    /// Whether every dispatched chunk failed.
    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.success_count() == 0
    }

    /// Summaries in chunk order, blank ones dropped.
    pub fn summaries(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|r| r.summary.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Executes chunk prompts under concurrency, retry and quota limits.
#[derive(Debug, Clone, Default)]
pub struct BatchDispatcher {
    config: DispatchConfig,
}

struct ChunkOutcome {
    result: BatchResult,
    quota_exhausted: bool,
}

impl BatchDispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch `chunks` in order.
    ///
    /// Stops starting new batches once `success_budget` chunks have
    /// succeeded or a quota error is seen. `prompt` builds the prompt for a
    /// chunk.
    pub async fn dispatch<G, F>(
        &self,
        chunks: &[Chunk],
        generator: &G,
        max_output_tokens: usize,
        success_budget: usize,
        prompt: F,
    ) -> DispatchReport
    where
        G: TextGenerator + ?Sized,
        F: Fn(&Chunk) -> String,
    {
        let batch_size = self.config.batch_size.max(1);
        let mut report = DispatchReport::default();
        let mut dispatched = 0;
        let mut successes = 0;

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            if batch_no > 0 {
                sleep(self.config.inter_batch_delay()).await;
            }

            debug!(batch = batch_no, size = batch.len(), "Dispatching batch");
            report.batches += 1;

            let outcomes = join_all(
                batch
                    .iter()
                    .map(|chunk| self.dispatch_one(chunk, generator, max_output_tokens, &prompt)),
            )
            .await;
            dispatched += batch.len();

            for outcome in outcomes {
                if outcome.result.success {
                    successes += 1;
                }
                report.quota_exhausted |= outcome.quota_exhausted;
                report.results.push(outcome.result);
            }

            if report.quota_exhausted {
                warn!(
                    batch = batch_no,
                    remaining = chunks.len() - dispatched,
                    "Quota exhausted, stopping dispatch"
                );
                break;
            }

            if successes >= success_budget {
                debug!(successes, "Processing budget reached");
                break;
            }
        }

        report.skipped = chunks.len() - dispatched;
        report.results.sort_by_key(|r| r.chunk_index);

        info!(
            dispatched,
            succeeded = successes,
            failed = dispatched - successes,
            skipped = report.skipped,
            quota_exhausted = report.quota_exhausted,
            "Dispatch complete"
        );

        report
    }

    async fn dispatch_one<G, F>(
        &self,
        chunk: &Chunk,
        generator: &G,
        max_output_tokens: usize,
        prompt: &F,
    ) -> ChunkOutcome
    where
        G: TextGenerator + ?Sized,
        F: Fn(&Chunk) -> String,
    {
        let prompt_text = prompt(chunk);

        let outcome = self
            .config
            .retry
            .run(self.config.request_timeout(), |attempt| {
                debug!(chunk_index = chunk.index, attempt, "Generating chunk summary");
                generator.generate(&prompt_text, max_output_tokens)
            })
            .await;

        let result = outcome.result.and_then(|text| {
            let text = text.trim();
            if text.is_empty() {
                Err(GenerationError::InvalidResponse("empty summary".to_string()))
            } else {
                Ok(text.to_string())
            }
        });

        match result {
            Ok(summary) => ChunkOutcome {
                result: BatchResult::success(chunk.index, summary, outcome.attempts),
                quota_exhausted: false,
            },
            Err(e) => {
                warn!(
                    chunk_index = chunk.index,
                    attempts = outcome.attempts,
                    error = %e,
                    "Chunk generation failed, using extractive fallback"
                );
                let fallback =
                    extractive_summary(body_text(chunk), self.config.fallback_sentences);
                ChunkOutcome {
                    quota_exhausted: e.is_quota_exhausted(),
                    result: BatchResult::failure(chunk.index, fallback, outcome.attempts, e.to_string()),
                }
            }
        }
    }
}

/// Chunk text without the metadata preamble.
fn body_text(chunk: &Chunk) -> &str {
    if chunk.has_metadata {
        chunk.text.split_once("\n\n").map_or("", |(_, body)| body)
    } else {
        &chunk.text
    }
}
