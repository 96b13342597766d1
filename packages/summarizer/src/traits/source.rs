//! Content source trait.

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::types::page::{PageContent, PageMetadata};

/// Yields structured page text for a page handle (tab id, URL, ...).
///
/// DOM walking and site-specific selectors live behind this trait.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Extract the page identified by `handle`.
    async fn extract(&self, handle: &str)
        -> Result<(PageContent, PageMetadata), ExtractionError>;
}
