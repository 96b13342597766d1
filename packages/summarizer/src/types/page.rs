//! Page types - structured content handed to the pipeline.

use serde::{Deserialize, Serialize};

/// Structured page text, sections in source document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContent {
    /// Page title
    pub title: String,

    /// Sections in document order
    #[serde(default)]
    pub sections: Vec<Section>,

    /// Page URL
    pub url: String,
}

impl PageContent {
    /// Create an empty page.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
            url: url.into(),
        }
    }

    /// Build a page from plain text.
    ///
    /// All text lands in one `root` section; blank-line separated paragraphs
    /// become `p` blocks.
    pub fn from_text(title: impl Into<String>, url: impl Into<String>, text: &str) -> Self {
        let blocks: Vec<ContentBlock> = text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| ContentBlock::new("p", p))
            .collect();

        let mut page = Self::new(title, url);
        if !blocks.is_empty() {
            page.sections.push(Section {
                heading: String::new(),
                level: SectionLevel::Root,
                content: blocks,
            });
        }
        page
    }

    /// Add a section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Whether any section carries text.
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(Section::is_empty)
    }

    /// All block text joined in document order.
    pub fn plain_text(&self) -> String {
        self.sections
            .iter()
            .map(Section::format)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Heading level of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionLevel {
    H1,
    H2,
    H3,
    /// Leading or unsectioned content
    Root,
    Subsection,
    /// A piece cut out of an oversized section
    SplitContent,
}

impl SectionLevel {
    fn heading_prefix(self) -> &'static str {
        match self {
            Self::H1 => "# ",
            Self::H2 => "## ",
            Self::H3 => "### ",
            Self::Root | Self::Subsection | Self::SplitContent => "",
        }
    }
}

/// A headed run of content blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text (may be empty)
    #[serde(default)]
    pub heading: String,

    pub level: SectionLevel,

    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl Section {
    /// Create a section with no blocks.
    pub fn new(heading: impl Into<String>, level: SectionLevel) -> Self {
        Self {
            heading: heading.into(),
            level,
            content: Vec::new(),
        }
    }

    /// Add a block.
    pub fn with_block(mut self, tag: impl Into<String>, text: impl Into<String>) -> Self {
        self.content.push(ContentBlock::new(tag, text));
        self
    }

    /// Whether the section has neither heading nor body text.
    pub fn is_empty(&self) -> bool {
        self.heading.trim().is_empty() && self.content.iter().all(|b| b.text.trim().is_empty())
    }

    /// Render heading and body as text.
    pub fn format(&self) -> String {
        let mut parts = Vec::with_capacity(self.content.len() + 1);

        let heading = self.heading.trim();
        if !heading.is_empty() {
            parts.push(format!("{}{}", self.level.heading_prefix(), heading));
        }

        parts.extend(self.content.iter().filter_map(ContentBlock::format));
        parts.join("\n\n")
    }
}

/// A single block of text tagged with its source element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Source tag name (p, li, blockquote, pre, td, ...)
    #[serde(rename = "type")]
    pub tag: String,

    pub text: String,
}

impl ContentBlock {
    /// Create a block.
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
        }
    }

    fn format(&self) -> Option<String> {
        let text = self.text.trim();
        if text.is_empty() {
            return None;
        }

        Some(match self.tag.as_str() {
            "li" => format!("- {}", text),
            "blockquote" => format!("> {}", text),
            "td" | "th" | "tr" => format!("| {} |", text),
            _ => text.to_string(),
        })
    }
}

/// Page metadata reported by the content source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    #[serde(default)]
    pub author: Option<String>,

    /// Publication date as reported by the page
    #[serde(default)]
    pub published: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub site_name: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Viewer comments (video pages)
    #[serde(default)]
    pub comments: Vec<String>,
}

impl PageMetadata {
    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the publication date.
    pub fn with_published(mut self, published: impl Into<String>) -> Self {
        self.published = Some(published.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Add a viewer comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }
}

/// Page data as received at the public entry point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub title: String,

    pub url: String,

    /// Plain text content
    #[serde(default)]
    pub content: String,

    /// Structured sections, when the source provides them
    #[serde(default)]
    pub sections: Vec<Section>,

    #[serde(default)]
    pub metadata: PageMetadata,
}

impl PageData {
    /// Create page data from plain text.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            sections: Vec::new(),
            metadata: PageMetadata::default(),
        }
    }

    /// Build page data from extracted structure.
    pub fn from_content(content: PageContent, metadata: PageMetadata) -> Self {
        let text = content.plain_text();
        Self {
            title: content.title,
            url: content.url,
            content: text,
            sections: content.sections,
            metadata,
        }
    }

    /// Set metadata.
    pub fn with_metadata(mut self, metadata: PageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Structured view of the page: the given sections, or the plain text
    /// when no section carries any.
    pub fn page_content(&self) -> PageContent {
        if self.sections.iter().all(Section::is_empty) {
            PageContent::from_text(&self.title, &self.url, &self.content)
        } else {
            PageContent {
                title: self.title.clone(),
                sections: self.sections.clone(),
                url: self.url.clone(),
            }
        }
    }

    /// Text used for fingerprinting and the single-pass fallback.
    pub fn text(&self) -> String {
        if self.content.trim().is_empty() {
            self.page_content().plain_text()
        } else {
            self.content.clone()
        }
    }

    /// Whether there is nothing to summarize.
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.sections.iter().all(Section::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_splits_paragraphs() {
        let page = PageContent::from_text("T", "https://a.com", "First.\n\nSecond.\n\n\n\nThird.");
        assert_eq!(page.sections.len(), 1);
        assert_eq!(page.sections[0].level, SectionLevel::Root);
        assert_eq!(page.sections[0].content.len(), 3);
    }

    #[test]
    fn test_from_text_empty() {
        let page = PageContent::from_text("T", "https://a.com", "   \n\n ");
        assert!(page.sections.is_empty());
        assert!(page.is_empty());
    }

    #[test]
    fn test_section_format() {
        let section = Section::new("Results", SectionLevel::H2)
            .with_block("p", "Intro text.")
            .with_block("li", "First point")
            .with_block("p", "   ");

        assert_eq!(section.format(), "## Results\n\nIntro text.\n\n- First point");
    }

    #[test]
    fn test_empty_heading_only_section() {
        let section = Section::new("", SectionLevel::Root).with_block("p", "");
        assert!(section.is_empty());
        assert_eq!(section.format(), "");
    }

    #[test]
    fn test_page_data_deserializes_camel_case() {
        let json = r#"{
            "title": "Hello",
            "url": "https://a.com",
            "content": "Body",
            "metadata": {"author": "Jane Doe", "siteName": "A"}
        }"#;

        let page: PageData = serde_json::from_str(json).unwrap();
        assert_eq!(page.metadata.author.as_deref(), Some("Jane Doe"));
        assert_eq!(page.metadata.site_name.as_deref(), Some("A"));
        assert!(page.sections.is_empty());
    }
}
