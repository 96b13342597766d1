//! OpenAI-compatible chat-completions generator.
//!
//! Works against any endpoint speaking the `/chat/completions` shape
//! (OpenAI, Azure-style proxies, local servers). Failures are mapped onto
//! [`GenerationError`] so the dispatcher can decide what to retry.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::{header, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GenerationError, GenerationResult};
use crate::traits::generator::TextGenerator;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

const SYSTEM_PROMPT: &str =
    "You write faithful, concise summaries of web page content. Answer with the summary only.";

/// Text generator backed by a chat-completions endpoint.
pub struct OpenAiGenerator {
    http_client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
    temperature: f32,
    timeout: Duration,
    limiter: Option<Arc<DefaultRateLimiter>>,
}

impl OpenAiGenerator {
    /// Create a generator for `model`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: SecretString::from(api_key.into()),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(60),
            limiter: None,
        }
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// HTTP-level timeout; the dispatcher applies its own per-call bound on top.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pace requests client-side to at most `requests_per_minute`.
    pub fn with_requests_per_minute(mut self, requests_per_minute: NonZeroU32) -> Self {
        let quota = Quota::per_minute(requests_per_minute);
        self.limiter = Some(Arc::new(RateLimiter::direct(quota)));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str, max_output_tokens: usize) -> GenerationResult<String> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: max_output_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Chat completion request failed");
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout)
                } else {
                    GenerationError::Transient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %body, "Chat completion API error");
            return Err(classify_status(status, retry_after, &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GenerationError::Transient(e.to_string()))?;
        let content = parse_content(&body)?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            chars = content.len(),
            "Chat completion"
        );

        Ok(content)
    }
}

/// Map a non-success HTTP status to a generation error.
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> GenerationError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT => GenerationError::Transient(format!("HTTP {}", status)),
        s if s.is_server_error() => GenerationError::Transient(format!("HTTP {}: {}", s, body)),
        s => GenerationError::InvalidResponse(format!("HTTP {}: {}", s, body)),
    }
}

/// Extract the first choice's text from a response body.
fn parse_content(body: &[u8]) -> GenerationResult<String> {
    let response: ChatResponse = serde_json::from_slice(body)
        .map_err(|e| GenerationError::InvalidResponse(format!("undecodable body: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| GenerationError::InvalidResponse("no content in response".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(20)), ""),
            GenerationError::RateLimited {
                retry_after: Some(Duration::from_secs(20))
            }
        );
        assert!(classify_status(StatusCode::BAD_GATEWAY, None, "").is_retryable());
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, None, "").is_retryable());
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, None, "bad"),
            GenerationError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_parse_content() {
        let body = br#"{"choices":[{"message":{"role":"assistant","content":"  A summary. "}}]}"#;
        assert_eq!(parse_content(body).unwrap(), "A summary.");
    }

    #[test]
    fn test_parse_content_rejects_empty_and_garbage() {
        assert!(parse_content(br#"{"choices":[]}"#).is_err());
        assert!(parse_content(br#"{"choices":[{"message":{"content":""}}]}"#).is_err());
        assert!(parse_content(b"<html>").is_err());
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let generator = OpenAiGenerator::new("sk-secret", DEFAULT_MODEL)
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(generator.base_url(), "http://localhost:8080/v1");
        assert!(!format!("{:?}", generator.api_key).contains("sk-secret"));
    }
}
