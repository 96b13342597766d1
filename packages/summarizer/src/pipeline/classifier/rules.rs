//! Content-type rule table.
//!
//! A [`ClassifierRules`] value is immutable once built and injected into the
//! [`PageClassifier`](super::PageClassifier). Tests build their own tables
//! with [`ContentRule`]'s builder methods.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, SummarizeError};
use crate::types::classification::ContentType;

/// A pattern found in body text that adds a fixed bonus.
#[derive(Debug, Clone)]
pub struct StructuralCue {
    /// Short name used in reasoning output
    pub label: String,
    pub pattern: Regex,
    pub bonus: f32,
}

/// Signals and selection parameters for one content type.
#[derive(Debug, Clone)]
pub struct ContentRule {
    pub content_type: ContentType,

    /// Tiebreaker when sorting candidates; higher wins
    pub priority: u8,

    /// Confidence that must be exceeded for the type to be accepted
    pub threshold: f32,

    /// Lowercase keywords looked up in URL, title, body and description
    pub indicators: Vec<String>,

    pub url_patterns: Vec<Regex>,
    pub title_patterns: Vec<Regex>,
    pub structural: Vec<StructuralCue>,

    /// Author patterns worth +2 (e.g. journalist bylines)
    pub author_patterns: Vec<Regex>,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| SummarizeError::Config(format!("invalid pattern {:?}: {}", pattern, e)))
}

fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p)).collect()
}

impl ContentRule {
    /// Create a rule with no signals.
    pub fn new(content_type: ContentType, priority: u8, threshold: f32) -> Self {
        Self {
            content_type,
            priority,
            threshold,
            indicators: Vec::new(),
            url_patterns: Vec::new(),
            title_patterns: Vec::new(),
            structural: Vec::new(),
            author_patterns: Vec::new(),
        }
    }

    /// Add keyword indicators (stored lowercase).
    pub fn with_indicators(mut self, indicators: &[&str]) -> Self {
        self.indicators
            .extend(indicators.iter().map(|i| i.to_lowercase()));
        self
    }

    /// Add URL regexes, matched against the lowercased URL.
    pub fn with_url_patterns(mut self, patterns: &[&str]) -> Result<Self> {
        self.url_patterns.extend(compile_all(patterns)?);
        Ok(self)
    }

    /// Add title regexes.
    pub fn with_title_patterns(mut self, patterns: &[&str]) -> Result<Self> {
        self.title_patterns.extend(compile_all(patterns)?);
        Ok(self)
    }

    /// Add a structural cue matched against the body text.
    pub fn with_structural_cue(mut self, label: &str, pattern: &str, bonus: f32) -> Result<Self> {
        self.structural.push(StructuralCue {
            label: label.to_string(),
            pattern: compile(pattern)?,
            bonus,
        });
        Ok(self)
    }

    /// Add author regexes.
    pub fn with_author_patterns(mut self, patterns: &[&str]) -> Result<Self> {
        self.author_patterns.extend(compile_all(patterns)?);
        Ok(self)
    }
}

/// An ordered, immutable set of content rules.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    rules: Vec<ContentRule>,
}

impl ClassifierRules {
    /// Validate and wrap a rule list.
    ///
    /// Fails on duplicate content types, on a rule for the generic type
    /// (generic is the fallback, not a candidate) and on thresholds outside
    /// `[0, 1]`.
    pub fn new(rules: Vec<ContentRule>) -> Result<Self> {
        for (i, rule) in rules.iter().enumerate() {
            if rule.content_type == ContentType::Generic {
                return Err(SummarizeError::Config(
                    "generic is the fallback type and cannot have a rule".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&rule.threshold) {
                return Err(SummarizeError::Config(format!(
                    "threshold for {} must be in [0, 1], got {}",
                    rule.content_type, rule.threshold
                )));
            }
            if rules[..i]
                .iter()
                .any(|r| r.content_type == rule.content_type)
            {
                return Err(SummarizeError::Config(format!(
                    "duplicate rule for {}",
                    rule.content_type
                )));
            }
        }

        Ok(Self { rules })
    }

    /// The default rule table.
    pub fn builtin() -> Self {
        BUILTIN_RULES.clone()
    }

    pub fn rules(&self) -> &[ContentRule] {
        &self.rules
    }

    pub fn get(&self, content_type: ContentType) -> Option<&ContentRule> {
        self.rules.iter().find(|r| r.content_type == content_type)
    }
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::builtin()
    }
}

lazy_static! {
    static ref BUILTIN_RULES: ClassifierRules =
        build_builtin().expect("builtin classifier rules are valid");
}

fn build_builtin() -> Result<ClassifierRules> {
    let video = ContentRule::new(ContentType::Video, 9, 0.5)
        .with_indicators(&[
            "youtube",
            "video",
            "watch",
            "interview",
            "episode",
            "podcast",
            "vlog",
            "trailer",
            "livestream",
        ])
        .with_url_patterns(&[
            r"youtube\.com",
            r"/watch\?v=",
            r"youtu\.be/",
            r"vimeo\.com/\d+",
            r"twitch\.tv/",
        ])?
        .with_title_patterns(&[r"(?i)\b(official video|full interview|episode \d+|trailer)\b"])?
        .with_structural_cue("timestamps", r"\b\d{1,2}:\d{2}\b", 1.0)?
        .with_structural_cue("view count", r"(?i)\b\d[\d,.]*[km]? views\b", 1.0)?;

    let academic = ContentRule::new(ContentType::Academic, 8, 0.6)
        .with_indicators(&[
            "abstract",
            "methodology",
            "doi",
            "journal",
            "peer-reviewed",
            "hypothesis",
            "findings",
            "et al",
            "literature review",
        ])
        .with_url_patterns(&[
            r"arxiv\.org",
            r"doi\.org",
            r"(pubmed|ncbi\.nlm\.nih\.gov|jstor\.org|sciencedirect\.com|springer\.com)",
            r"\.edu/",
        ])?
        .with_title_patterns(&[r"(?i)\b(a study of|analysis of|effects of|evidence for|towards)\b"])?
        .with_structural_cue("et al. citations", r"\bet al\.", 1.5)?
        .with_structural_cue("doi", r"(?i)\bdoi:\s*10\.\d{4,}", 2.0)?
        .with_structural_cue("author-year citations", r"\([A-Z][A-Za-z]+,? \d{4}\)", 1.0)?;

    let documentation = ContentRule::new(ContentType::Documentation, 7, 0.4)
        .with_indicators(&[
            "documentation",
            "api",
            "install",
            "usage",
            "parameters",
            "returns",
            "configuration",
            "getting started",
            "tutorial",
        ])
        .with_url_patterns(&[
            r"^https?://docs\.",
            r"/docs?/",
            r"/api/",
            r"readthedocs\.io",
            r"^https?://developer\.",
        ])?
        .with_title_patterns(&[r"(?i)\b(docs|documentation|api reference|guide|tutorial)\b"])?
        .with_structural_cue(
            "code",
            r"(?m)^\s*(\$ |npm |pip |cargo |fn |def |function |class |import )",
            2.0,
        )?
        .with_structural_cue("code fence", r"```", 1.0)?;

    let reference = ContentRule::new(ContentType::Reference, 6, 0.5)
        .with_indicators(&[
            "encyclopedia",
            "wikipedia",
            "references",
            "citation",
            "see also",
            "retrieved",
            "external links",
        ])
        .with_url_patterns(&[r"wikipedia\.org", r"/wiki/", r"(britannica|fandom)\.com"])?
        .with_title_patterns(&[r"(?i)- wikipedia$", r"(?i)\bwiki\b"])?
        .with_structural_cue("citation markers", r"\[\d+\]", 2.0)?;

    let news = ContentRule::new(ContentType::News, 5, 0.5)
        .with_indicators(&[
            "news",
            "breaking",
            "reported",
            "according to",
            "journalist",
            "correspondent",
            "press release",
            "reuters",
            "associated press",
        ])
        .with_url_patterns(&[
            r"/news/",
            r"/\d{4}/\d{2}/\d{2}/",
            r"(cnn|bbc|nytimes|reuters|theguardian|washingtonpost|apnews|npr)\.",
        ])?
        .with_title_patterns(&[r"(?i)\b(breaking|exclusive|live updates?|report)\b"])?
        .with_structural_cue("byline", r"(?m)^\s*By [A-Z][a-z]+ [A-Z][a-z]+", 2.0)?
        .with_structural_cue("dateline", r"(?i)\b(updated|published)\b:? +\w+ \d{1,2}", 1.0)?
        .with_author_patterns(&[
            r"(?i)\b(reporter|correspondent|staff writer|editor|journalist|news desk)\b",
        ])?;

    let product = ContentRule::new(ContentType::Product, 4, 0.5)
        .with_indicators(&[
            "price",
            "add to cart",
            "buy now",
            "in stock",
            "shipping",
            "customer reviews",
            "specifications",
            "warranty",
        ])
        .with_url_patterns(&[r"amazon\.", r"ebay\.", r"/(product|products|item|dp|shop)/"])?
        .with_title_patterns(&[r"(?i)\b(buy|price|sale|deal)\b"])?
        .with_structural_cue("price", r"[$€£]\s?\d+(?:[.,]\d{2})?", 2.0)?
        .with_structural_cue("star rating", r"\b[1-5](?:\.\d)? out of 5\b", 1.0)?;

    let forum = ContentRule::new(ContentType::Forum, 3, 0.4)
        .with_indicators(&[
            "reply",
            "replies",
            "thread",
            "posted by",
            "upvote",
            "forum",
            "answered",
        ])
        .with_url_patterns(&[
            r"reddit\.com",
            r"stackoverflow\.com",
            r"stackexchange\.com",
            r"news\.ycombinator\.com",
            r"/(forum|forums|thread|threads|questions)/",
        ])?
        .with_title_patterns(&[r"(?i)^(r/|ask )", r"\?$"])?
        .with_structural_cue("vote counts", r"(?i)\b\d+ (points|replies|comments)\b", 1.5)?;

    let blog = ContentRule::new(ContentType::Blog, 2, 0.3)
        .with_indicators(&[
            "blog",
            "posted on",
            "i think",
            "thoughts on",
            "subscribe",
            "newsletter",
            "my experience",
        ])
        .with_url_patterns(&[r"blog", r"medium\.com", r"substack\.com", r"wordpress\.com"])?
        .with_title_patterns(&[r"(?i)\b(my|how i|why i|thoughts)\b"])?
        .with_structural_cue("post footer", r"(?i)\bposted (on|by|in)\b", 1.0)?;

    ClassifierRules::new(vec![
        news,
        reference,
        video,
        academic,
        documentation,
        product,
        forum,
        blog,
    ])
}
