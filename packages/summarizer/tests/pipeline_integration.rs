//! Integration tests for the summarization pipeline.
//!
//! These tests drive the public API with the mock collaborators:
//! 1. Summarize and cache a page
//! 2. Classify pages by type
//! 3. Merge overlapping chunk summaries
//! 4. Stop dispatch on quota exhaustion
//! 5. Bound the cache size

use std::sync::Arc;
use std::time::Duration;

use summarizer::{
    pipeline::{BatchDispatcher, SummaryMerger},
    testing::{ManualClock, MockGenerator, MockSource},
    CacheConfig, CacheStore, Chunk, ChunkBoundary, ContentType, DispatchConfig, ExtractionError,
    GenerationError, MemoryStore, MergeConfig, PageContent, PageData, PageMetadata,
    PersistentStore, Request, Response, RetryPolicy, Section, SectionLevel, SummarizeError,
    Summarizer, SummarizerConfig, SummaryLength,
};

/// Config without real-time pauses between batches or retries.
fn fast_config() -> SummarizerConfig {
    SummarizerConfig::default().with_dispatch(
        DispatchConfig::default()
            .with_inter_batch_delay(Duration::ZERO)
            .with_retry(RetryPolicy::none()),
    )
}

/// Helper to create a page of roughly `chars` characters.
fn test_page(title: &str, url: &str, chars: usize) -> PageData {
    let sentence = "The library opened a new reading room for students in 2022. ";
    let content: String = sentence.repeat(chars / sentence.len() + 1).chars().take(chars).collect();
    PageData::new(title, url, content.trim_end())
}

/// Helper to create a numbered chunk.
fn numbered_chunk(index: usize) -> Chunk {
    let text = format!(
        "Part {:02}. The council reviewed budget item number {} during the 2021 session.",
        index, index
    );
    Chunk {
        index,
        char_count: text.chars().count(),
        token_count: text.chars().count().div_ceil(4),
        text,
        section_count: 1,
        has_metadata: false,
        boundary: ChunkBoundary::Sections,
    }
}

fn prompt_for(chunk: &Chunk) -> String {
    format!("Summarize this part.\nContent:\n{}", chunk.text)
}

#[tokio::test]
async fn test_single_chunk_page_is_cached_on_second_call() {
    let generator = MockGenerator::new();
    let summarizer = Summarizer::new(generator.clone(), MemoryStore::new(), fast_config());
    let page = test_page("Library news", "https://library.test/news/reading-room", 1200);

    let first = summarizer.summarize(&page, SummaryLength::Short).await.unwrap();
    assert!(!first.cached);
    assert_eq!(generator.call_count(), 1);
    let calls = generator.call_count();

    let second = summarizer.summarize(&page, SummaryLength::Short).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.summary, first.summary);
    assert_eq!(second.stats, first.stats);
    assert_eq!(generator.call_count(), calls);
}

#[tokio::test]
async fn test_video_interview_classifies_as_video() {
    let summarizer = Summarizer::new(MockGenerator::new(), MemoryStore::new(), fast_config());
    let page = PageData::new(
        "Full interview: the astronaut on life in orbit",
        "https://www.youtube.com/watch?v=Zx81kQ",
        "In this video the astronaut answers questions from viewers.",
    );

    let classification = summarizer.classify(&page);

    assert_eq!(classification.content_type, ContentType::Video);
    assert!(classification.confidence > 0.5);
    assert!(!classification.is_generic());
}

#[test]
fn test_near_duplicate_chunk_summaries_collapse() {
    let merger = SummaryMerger::new(MergeConfig::default());
    let summaries = vec![
        "The sky is blue.".to_string(),
        "The sky is blue today.".to_string(),
        "Grass is green.".to_string(),
    ];

    let merged = merger.merge(&summaries, SummaryLength::Medium);

    assert_eq!(merged.matches("sky").count(), 1);
    assert!(merged.contains("Grass is green."));
}

#[test]
fn test_merging_a_repeated_summary_is_idempotent() {
    let merger = SummaryMerger::new(MergeConfig::default());
    let once = vec![
        "Rivers flood in spring.".to_string(),
        "Dams hold the water back.".to_string(),
    ];
    let twice = vec![once[0].clone(), once[0].clone(), once[1].clone()];

    assert_eq!(
        merger.merge(&once, SummaryLength::Short),
        merger.merge(&twice, SummaryLength::Short)
    );
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_stops_later_batches() {
    let chunks: Vec<Chunk> = (0..12).map(numbered_chunk).collect();
    let generator = MockGenerator::new()
        .with_error("Part 07.", GenerationError::RateLimited { retry_after: None });
    let dispatcher = BatchDispatcher::new(DispatchConfig::default().with_batch_size(3));

    let report = dispatcher
        .dispatch(&chunks, &generator, 256, 12, prompt_for)
        .await;

    assert!(report.quota_exhausted);
    assert_eq!(report.batches, 3);
    assert_eq!(report.results.len(), 9);
    assert_eq!(report.skipped, 3);
    assert_eq!(report.success_count(), 8);

    let failed = &report.results[7];
    assert_eq!(failed.chunk_index, 7);
    assert!(!failed.success);
    assert!(failed.summary.contains("budget item number 7"));

    // Nothing from the fourth batch was requested
    for index in 9..12 {
        assert_eq!(generator.calls_containing(&format!("Part {:02}.", index)), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_results_follow_chunk_order_not_completion_order() {
    let chunks: Vec<Chunk> = (0..3).map(numbered_chunk).collect();
    let generator = MockGenerator::new()
        .with_latency("Part 00.", Duration::from_millis(300))
        .with_latency("Part 01.", Duration::from_millis(200))
        .with_latency("Part 02.", Duration::from_millis(100));
    let dispatcher = BatchDispatcher::new(DispatchConfig::default());

    let report = dispatcher
        .dispatch(&chunks, &generator, 256, 12, prompt_for)
        .await;

    let indices: Vec<usize> = report.results.iter().map(|r| r.chunk_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(report.summaries()[0].starts_with("Part 00."));
}

#[tokio::test]
async fn test_cache_keeps_most_recent_entries() {
    let clock = Arc::new(ManualClock::new(1_000));
    let cache = CacheStore::new(MemoryStore::new(), CacheConfig::default().with_max_entries(2))
        .with_clock(clock.clone());

    for name in ["first", "second", "third"] {
        let key = cache.key_for(name);
        cache.put(&key, name, Default::default()).await;
        clock.advance_ms(1_000);
    }

    let keys: Vec<String> = cache.store().get_all().await.unwrap().into_keys().collect();
    assert_eq!(keys, vec![cache.key_for("second"), cache.key_for("third")]);
    assert!(cache.get(&cache.key_for("first")).await.is_none());
    assert_eq!(cache.get(&cache.key_for("third")).await.unwrap().summary, "third");
}

#[tokio::test]
async fn test_expired_summary_is_regenerated() {
    let clock = Arc::new(ManualClock::new(0));
    let generator = MockGenerator::new();
    let summarizer = Summarizer::new(generator.clone(), MemoryStore::new(), fast_config())
        .with_clock(clock.clone());
    let page = test_page("Library news", "https://library.test/news", 600);

    summarizer.summarize(&page, SummaryLength::Medium).await.unwrap();
    clock.advance_ms(25 * 60 * 60 * 1000);
    let again = summarizer.summarize(&page, SummaryLength::Medium).await.unwrap();

    assert!(!again.cached);
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn test_quota_exhaustion_degrades_to_extractive_summary() {
    let generator = MockGenerator::failing(GenerationError::RateLimited {
        retry_after: Some(Duration::from_secs(60)),
    });
    let summarizer = Summarizer::new(generator.clone(), MemoryStore::new(), fast_config());
    let page = test_page("Library news", "https://library.test/news", 1200);

    let response = summarizer.summarize(&page, SummaryLength::Short).await.unwrap();

    assert!(response.degraded);
    assert!(response.summary.contains("reading room"));
    // One chunk call plus one single-pass call, neither retried
    assert_eq!(generator.call_count(), 2);
    assert_eq!(summarizer.cache_stats().await.entries, 0);
}

#[tokio::test]
async fn test_summarize_from_content_source() {
    let content = PageContent::new("Release notes", "https://docs.test/release")
        .with_section(
            Section::new("Version 2.0", SectionLevel::H2)
                .with_block("p", "Version 2.0 adds offline mode and a faster search index.")
                .with_block("li", "Offline mode"),
        );
    let source = MockSource::new().with_page(
        "tab-1",
        content,
        PageMetadata::default().with_author("Docs team"),
    );
    let generator = MockGenerator::new();
    let summarizer = Summarizer::new(generator.clone(), MemoryStore::new(), fast_config());

    let response = summarizer
        .summarize_source(&source, "tab-1", SummaryLength::Short)
        .await
        .unwrap();
    assert!(!response.cached);
    assert_eq!(generator.calls_containing("## Version 2.0"), 1);
    assert_eq!(generator.calls_containing("Author: Docs team"), 1);

    let missing = summarizer
        .summarize_source(&source, "tab-9", SummaryLength::Short)
        .await;
    assert!(matches!(
        missing,
        Err(SummarizeError::Extraction(ExtractionError::NotFound { .. }))
    ));

    let calls = generator.call_count();
    let broken = summarizer
        .summarize_source(
            &MockSource::new().with_failure("tab-2", "frame detached"),
            "tab-2",
            SummaryLength::Short,
        )
        .await;
    assert!(matches!(
        broken,
        Err(SummarizeError::Extraction(ExtractionError::Failed(_)))
    ));
    assert_eq!(generator.call_count(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_tabs_keep_input_order() {
    let generator = MockGenerator::new()
        .with_latency("Page title: Slow tab", Duration::from_millis(500))
        .with_latency("Page title: Quick tab", Duration::from_millis(10));
    let summarizer = Summarizer::new(generator, MemoryStore::new(), fast_config());
    let pages = vec![
        test_page("Slow tab", "https://a.test/slow", 400),
        PageData::new("Empty tab", "https://a.test/empty", ""),
        test_page("Quick tab", "https://a.test/quick", 400),
    ];

    let outcomes = summarizer.summarize_tabs(&pages, SummaryLength::Short).await;

    let urls: Vec<&str> = outcomes.iter().map(|o| o.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://a.test/slow", "https://a.test/empty", "https://a.test/quick"]
    );
    assert!(outcomes.iter().all(|o| o.response.is_some() && o.error.is_none()));
}

#[tokio::test]
async fn test_wire_request_round_trip() {
    let summarizer = Summarizer::new(MockGenerator::new(), MemoryStore::new(), fast_config());
    let request = Request::from_json(
        r#"{
            "action": "summarize",
            "payload": {
                "page": {
                    "title": "Council vote",
                    "url": "https://news.test/council-vote",
                    "content": "The council approved the new cycling lanes on Tuesday. Work starts in May."
                },
                "length": "short"
            }
        }"#,
    )
    .unwrap();

    let response = summarizer.handle(request).await;
    let json = response.to_json().unwrap();

    assert!(json.contains(r#""action":"summary""#));
    assert!(json.contains(r#""cached":false"#));
    assert!(json.contains(r#""wordCount""#));

    let stats = summarizer.handle(Request::CacheStats).await;
    assert!(matches!(stats, Response::CacheStats(s) if s.entries == 1));
}
