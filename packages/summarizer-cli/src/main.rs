//! Command-line front end for the summarizer.
//!
//! Reads page JSON (`{"title", "url", "content", "sections", "metadata"}`)
//! from a file or stdin and prints JSON results. Summaries are cached in
//! SQLite between runs.

mod config;

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use summarizer::{
    providers::{ContextChain, DuckDuckGoContext, OpenAiGenerator, WikipediaContext},
    CacheStore, PageClassifier, PageData, Request, SqliteStore, Summarizer, SummarizerConfig,
    SummaryLength,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{load_summarizer_config, Config};

#[derive(Parser)]
#[command(name = "summarize")]
#[command(about = "Summarize web pages with an LLM, within quota")]
struct Cli {
    /// JSON file with pipeline settings (missing fields use defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a page
    Page {
        /// Page JSON file, `-` for stdin
        file: PathBuf,

        /// short, medium or long
        #[arg(long, default_value = "medium")]
        length: SummaryLength,

        /// Look up background context for the page title
        #[arg(long)]
        context: bool,
    },

    /// Summarize several pages (a JSON array) concurrently
    Tabs {
        file: PathBuf,

        #[arg(long, default_value = "medium")]
        length: SummaryLength,
    },

    /// Classify a page without summarizing
    Classify { file: PathBuf },

    /// Answer a wire-format request (`{"action": ..., "payload": ...}`)
    Request { file: PathBuf },

    /// Cache maintenance
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Entry count and age range
    Stats,

    /// Evict expired and overflow entries
    Cleanup,

    /// Remove every entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,summarizer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    let settings = load_summarizer_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Page {
            file,
            length,
            context,
        } => {
            let page: PageData = read_json(&file)?;
            let mut summarizer = build_summarizer(&config, settings).await?;
            if context {
                summarizer = summarizer.with_context_provider(
                    ContextChain::new()
                        .with_provider(WikipediaContext::default())
                        .with_provider(DuckDuckGoContext::new()),
                );
            }

            let response = summarizer
                .summarize(&page, length)
                .await
                .context("Summarization failed")?;
            print_json(&response)
        }
        Commands::Tabs { file, length } => {
            let pages: Vec<PageData> = read_json(&file)?;
            let summarizer = build_summarizer(&config, settings).await?;
            let outcomes = summarizer.summarize_tabs(&pages, length).await;
            print_json(&outcomes)
        }
        Commands::Classify { file } => {
            let page: PageData = read_json(&file)?;
            print_json(&PageClassifier::default().classify(&page))
        }
        Commands::Request { file } => {
            let raw = read_input(&file)?;
            let request = Request::from_json(&raw).context("Invalid request")?;
            let summarizer = build_summarizer(&config, settings).await?;
            let response = summarizer.handle(request).await;
            println!("{}", response.to_json()?);
            Ok(())
        }
        Commands::Cache { command } => {
            let store = open_store(&config).await?;
            let cache = CacheStore::new(store, settings.cache);
            let report: Value = match command {
                CacheCommands::Stats => serde_json::to_value(cache.stats().await)?,
                CacheCommands::Cleanup => serde_json::json!({ "evicted": cache.cleanup().await }),
                CacheCommands::Clear => serde_json::json!({ "removed": cache.clear().await }),
            };
            print_json(&report)
        }
    }
}

async fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::new(&config.cache_db)
        .await
        .with_context(|| format!("Failed to open cache database {}", config.cache_db))
}

async fn build_summarizer(
    config: &Config,
    settings: SummarizerConfig,
) -> Result<Summarizer<OpenAiGenerator, SqliteStore>> {
    let mut generator = OpenAiGenerator::new(config.api_key()?, &config.model);
    if let Some(base_url) = &config.base_url {
        generator = generator.with_base_url(base_url);
    }
    if let Some(rpm) = config.requests_per_minute {
        generator = generator.with_requests_per_minute(rpm);
    }

    tracing::info!(model = %generator.model(), base_url = %generator.base_url(), "Generator configured");

    let store = open_store(config).await?;
    Ok(Summarizer::new(generator, store, settings))
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read stdin")?;
        return Ok(raw);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
