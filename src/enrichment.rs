use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::error::{AppError, Result};
use crate::extractor::PageMetadata;
use crate::llm::TextGenerator;

const MAX_TAGS: usize = 10;
const MAX_KEY_CONCEPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for DifficultyLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(DifficultyLevel::Beginner),
            "intermediate" => Ok(DifficultyLevel::Intermediate),
            "advanced" => Ok(DifficultyLevel::Advanced),
            other => Err(AppError::ParseError(format!("Unknown difficulty level: {}", other))),
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        };
        f.write_str(label)
    }
}

/// Fields recovered from the enrichment reply. `None` means the reply did not carry the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentResult {
    pub technologies: Option<Vec<String>>,
    pub programming_languages: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub key_concepts: Option<Vec<String>>,
    pub code_examples: Option<bool>,
    pub difficulty_level: Option<DifficultyLevel>,
    pub summary: Option<String>,
    pub revised_content: String,
}

/// Turns a raw service reply into an [`EnrichmentResult`].
///
/// `original` is the converted page text, used when the reply has no content section.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, reply: &str, original: &str) -> EnrichmentResult;
}

pub fn build_prompt(content: &str, url: &str, metadata: &PageMetadata) -> String {
    let mut result = String::with_capacity(content.len() + 2048);
    result.push_str(
        "You are a technical content analyzer. Read the content below and extract metadata from it.

Your reply MUST use exactly this layout:

## Metadata
Technologies: [comma-separated list, e.g. ASP.NET Core, Dapper, PostgreSQL]
Programming_Languages: [comma-separated list, e.g. C#, SQL, JavaScript]
Tags: [comma-separated list, e.g. orm, database, web-api]
Key_Concepts: [comma-separated list, e.g. repository-pattern, dependency-injection]
Code_Examples: [yes or no]
Difficulty_Level: [beginner or intermediate or advanced]
Summary: [4-6 sentences]

## Content
[the improved markdown content]

Rules:
1. Technologies: every technology, framework, library and tool mentioned
2. Programming_Languages: programming languages only, never frameworks
3. Tags: lowercase, hyphenated categorization terms, at most 10
4. Key_Concepts: the main technical concepts, patterns or methodologies, at most 8
5. Never leave a field empty; write \"none\" when nothing applies
6. Keep the original structure of the content while improving formatting and clarity

",
    );
    result.push_str(&format!(
        "Now analyze this content from {} (page title: {}):\n\n",
        url, metadata.title
    ));
    result.push_str(content);
    result
}

static METADATA_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"## Metadata\n([\s\S]*?)\n\n## Content").expect("valid regex"));
static CONTENT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"## Content\n([\s\S]*)").expect("valid regex"));

fn list_field(label: &str) -> Regex {
    Regex::new(&format!(r"(?is){}:\s*\[([^\]]*)\]", label)).expect("valid regex")
}

static TECHNOLOGIES: Lazy<Regex> = Lazy::new(|| list_field("Technologies"));
static PROGRAMMING_LANGUAGES: Lazy<Regex> = Lazy::new(|| list_field("Programming_Languages"));
static TAGS: Lazy<Regex> = Lazy::new(|| list_field("Tags"));
static KEY_CONCEPTS: Lazy<Regex> = Lazy::new(|| list_field("Key_Concepts"));
static CODE_EXAMPLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Code_Examples:\s*\[?\s*(yes|no)\b").expect("valid regex"));
static DIFFICULTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Difficulty_Level:\s*\[?\s*(beginner|intermediate|advanced)\b")
        .expect("valid regex")
});
static SUMMARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)Summary:\s*(.*)").expect("valid regex"));

#[derive(Debug, Default, Clone, Copy)]
pub struct LabeledReplyParser;

impl LabeledReplyParser {
    fn list(pattern: &Regex, block: &str, cap: usize) -> Option<Vec<String>> {
        let raw = pattern.captures(block)?.get(1)?.as_str().trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
            return Some(Vec::new());
        }
        Some(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .take(cap)
                .map(str::to_string)
                .collect(),
        )
    }

    fn summary(block: &str) -> Option<String> {
        let rest = SUMMARY.captures(block)?.get(1)?.as_str();
        let first_paragraph = rest.split("\n\n").next().unwrap_or_default().trim();
        let unbracketed = first_paragraph
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(first_paragraph)
            .trim();
        Some(unbracketed.to_string())
    }
}

impl ResponseParser for LabeledReplyParser {
    fn parse(&self, reply: &str, original: &str) -> EnrichmentResult {
        let revised_content = CONTENT_BLOCK
            .captures(reply)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| original.to_string());

        let Some(block) = METADATA_BLOCK
            .captures(reply)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
        else {
            return EnrichmentResult {
                revised_content,
                ..EnrichmentResult::default()
            };
        };

        EnrichmentResult {
            technologies: Self::list(&TECHNOLOGIES, block, usize::MAX),
            programming_languages: Self::list(&PROGRAMMING_LANGUAGES, block, usize::MAX),
            tags: Self::list(&TAGS, block, MAX_TAGS),
            key_concepts: Self::list(&KEY_CONCEPTS, block, MAX_KEY_CONCEPTS),
            code_examples: CODE_EXAMPLES
                .captures(block)
                .map(|caps| caps[1].eq_ignore_ascii_case("yes")),
            difficulty_level: DIFFICULTY
                .captures(block)
                .and_then(|caps| caps[1].parse().ok()),
            summary: Self::summary(block),
            revised_content,
        }
    }
}

pub struct Enricher {
    generator: Box<dyn TextGenerator>,
    parser: Box<dyn ResponseParser>,
}

impl Enricher {
    pub fn new(generator: Box<dyn TextGenerator>, parser: Box<dyn ResponseParser>) -> Self {
        Enricher { generator, parser }
    }

    pub async fn enrich(
        &self,
        content: &str,
        metadata: &PageMetadata,
        url: &str,
    ) -> Result<EnrichmentResult> {
        let prompt = build_prompt(content, url, metadata);
        info!("Processing with Gemini API...");

        let reply = self.generator.generate(&prompt).await.map_err(|e| match e {
            AppError::LlmError(msg) => AppError::LlmError(format!("{} ({})", msg, url)),
            other => AppError::LlmError(format!("Gemini API error for {}: {}", url, other)),
        })?;

        Ok(self.parser.parse(&reply, content))
    }
}
