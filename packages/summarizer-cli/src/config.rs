use std::env;
use std::num::NonZeroU32;
use std::path::Path;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use summarizer::{providers::openai::DEFAULT_MODEL, SummarizerConfig};

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub requests_per_minute: Option<NonZeroU32>,
    pub cache_db: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            model: env::var("SUMMARIZER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: env::var("SUMMARIZER_BASE_URL").ok(),
            requests_per_minute: env::var("SUMMARIZER_REQUESTS_PER_MINUTE")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("SUMMARIZER_REQUESTS_PER_MINUTE must be a positive number")?,
            cache_db: env::var("SUMMARIZER_CACHE_DB")
                .unwrap_or_else(|_| "sqlite://summaries.db?mode=rwc".to_string()),
        })
    }

    pub fn api_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY must be set")
    }
}

/// Pipeline settings from a JSON file, or the defaults.
pub fn load_summarizer_config(path: Option<&Path>) -> Result<SummarizerConfig> {
    let Some(path) = path else {
        return Ok(SummarizerConfig::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config file {}", path.display()))
}
