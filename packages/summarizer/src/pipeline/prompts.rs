//! Prompt templates for chunk summarization.
//!
//! One instruction block per content type. Every prompt ends with the chunk
//! text after a `Content:` line, so the chunk is always the last thing the
//! model reads.

use sha2::{Digest, Sha256};

use crate::types::{classification::ContentType, summary::SummaryLength};

/// Frame shared by all content types.
pub const CHUNK_PROMPT: &str = r#"You are summarizing one part of a longer web page.

{instructions}

Write {target} in plain prose. Do not add information that is not in the text, do not mention that this is a part of a page, and do not use headings or bullet points.

Page title: {title}{context_section}

Content:
{content}"#;

pub const NEWS_INSTRUCTIONS: &str = "This is a news article. Report who did what, when and where, keep the key figures and dates, and attribute claims to their sources.";

pub const REFERENCE_INSTRUCTIONS: &str = "This is an encyclopedia-style reference article. State the essential definition first, then the most important facts, keeping names and dates exact.";

pub const VIDEO_INSTRUCTIONS: &str = "This is the description and transcript of a video page. Summarize what the video covers and its main points. If viewer comments are included, briefly describe the audience reaction.";

pub const ACADEMIC_INSTRUCTIONS: &str = "This is an academic or scientific text. Cover the research question, the method, the main findings with their figures, and the stated limitations.";

pub const DOCUMENTATION_INSTRUCTIONS: &str = "This is technical documentation. Explain what the described feature does, how it is used, and any important parameters, requirements or caveats. Keep identifiers exactly as written.";

pub const PRODUCT_INSTRUCTIONS: &str = "This is a product page. Describe the product, its key features and specifications, the price if given, and the overall tone of any reviews.";

pub const FORUM_INSTRUCTIONS: &str = "This is a forum or discussion thread. State the question or topic, the main answers or positions, and any consensus that emerges.";

pub const BLOG_INSTRUCTIONS: &str = "This is a blog post. Capture the author's main argument or story and the key takeaways.";

pub const GENERIC_INSTRUCTIONS: &str = "Summarize the main points of this text.";

/// Instruction block for a content type.
pub fn instructions_for(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::News => NEWS_INSTRUCTIONS,
        ContentType::Reference => REFERENCE_INSTRUCTIONS,
        ContentType::Video => VIDEO_INSTRUCTIONS,
        ContentType::Academic => ACADEMIC_INSTRUCTIONS,
        ContentType::Documentation => DOCUMENTATION_INSTRUCTIONS,
        ContentType::Product => PRODUCT_INSTRUCTIONS,
        ContentType::Forum => FORUM_INSTRUCTIONS,
        ContentType::Blog => BLOG_INSTRUCTIONS,
        ContentType::Generic => GENERIC_INSTRUCTIONS,
    }
}

/// Length wording for one chunk summary.
pub fn chunk_target(length: SummaryLength) -> &'static str {
    match length {
        SummaryLength::Short => "2-3 sentences (at most 60 words)",
        SummaryLength::Medium => "4-6 sentences (at most 120 words)",
        SummaryLength::Long => "one detailed paragraph (at most 200 words)",
    }
}

/// Length wording for a whole-page single-pass summary.
pub fn page_target(length: SummaryLength) -> &'static str {
    match length {
        SummaryLength::Short => "a summary of at most 100 words",
        SummaryLength::Medium => "a summary of at most 300 words",
        SummaryLength::Long => "a summary of at most 500 words",
    }
}

/// Format a chunk prompt.
///
/// `context` is optional background text placed in its own section before
/// the content.
pub fn format_chunk_prompt(
    content_type: ContentType,
    length: SummaryLength,
    title: &str,
    context: Option<&str>,
    content: &str,
) -> String {
    render(instructions_for(content_type), chunk_target(length), title, context, content)
}

/// Format the single-pass fallback prompt over a whole (truncated) page.
pub fn format_single_pass_prompt(length: SummaryLength, title: &str, content: &str) -> String {
    render(GENERIC_INSTRUCTIONS, page_target(length), title, None, content)
}

fn render(
    instructions: &str,
    target: &str,
    title: &str,
    context: Option<&str>,
    content: &str,
) -> String {
    let context_section = match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "\n\nBackground (for orientation only, do not summarize it):\n{}",
            context
        ),
        None => String::new(),
    };

    fill(
        CHUNK_PROMPT,
        &[
            ("instructions", instructions),
            ("target", target),
            ("title", title.trim()),
            ("context_section", &context_section),
            ("content", content),
        ],
    )
}

/// Substitute `{name}` placeholders in a single pass.
///
/// Inserted values are never rescanned, so page text containing a
/// placeholder is copied as written.
fn fill(template: &str, fields: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(
        template.len() + fields.iter().map(|(_, value)| value.len()).sum::<usize>(),
    );
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];

        let field = fields.iter().find_map(|(name, value)| {
            let after = tail.strip_prefix(*name)?.strip_prefix('}')?;
            Some((*value, after))
        });
        match field {
            Some((value, after)) => {
                out.push_str(value);
                rest = after;
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Hash of the prompt frame, recorded with cached summaries.
pub fn chunk_prompt_hash() -> String {
    let mut hasher = Sha256::new();
    hasher.update(CHUNK_PROMPT.as_bytes());
    format!("{:x}", hasher.finalize())
}
