//! Text generation trait.

use async_trait::async_trait;

use crate::error::GenerationResult;

/// An external large-language-model endpoint.
///
/// Given a prompt and an output budget, returns generated text. Errors
/// classify the failure so the dispatcher knows whether to retry
/// ([`GenerationError::Transient`](crate::error::GenerationError::Transient)),
/// stop scheduling ([`GenerationError::RateLimited`](crate::error::GenerationError::RateLimited))
/// or fall back for that call
/// ([`GenerationError::InvalidResponse`](crate::error::GenerationError::InvalidResponse)).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for `prompt`, producing at most `max_output_tokens`.
    async fn generate(&self, prompt: &str, max_output_tokens: usize) -> GenerationResult<String>;
}

#[async_trait]
impl<T: TextGenerator + ?Sized> TextGenerator for std::sync::Arc<T> {
    async fn generate(&self, prompt: &str, max_output_tokens: usize) -> GenerationResult<String> {
        (**self).generate(prompt, max_output_tokens).await
    }
}
