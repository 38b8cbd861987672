use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tokio::fs;

use crate::enrichment::EnrichmentResult;
use crate::error::Result;
use crate::extractor::{PageMetadata, network_location};

const MAX_PATH_CHARS: usize = 100;
const CATEGORY: &str = "programming";

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-.]").expect("valid regex"));

/// Output file name for `url`.
///
/// Only the host and path take part, so URLs that differ just by query string
/// or fragment map to the same file. An empty path falls back to `now`.
pub fn file_name_for(url: &str, now: DateTime<Local>) -> String {
    let location = network_location(url);
    let domain = location.strip_prefix("www.").unwrap_or(&location);

    let path = raw_path(url).trim_matches('/').replace('/', "_");

    let name = if path.is_empty() {
        format!("{}_{}.md", domain, now.format("%Y%m%d_%H%M%S"))
    } else {
        let truncated: String = path.chars().take(MAX_PATH_CHARS).collect();
        format!("{}_{}.md", domain, truncated)
    };

    UNSAFE_FILENAME_CHARS.replace_all(&name, "_").into_owned()
}

// Path as written in the URL: after the authority, before any query or fragment.
// Percent-encoding and dot segments are left alone.
fn raw_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => {
            let after_scheme = &url[idx + 3..];
            let authority_end = after_scheme.find(['/', '?', '#']).unwrap_or(after_scheme.len());
            &after_scheme[authority_end..]
        }
        None => url,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

pub fn render_document(
    url: &str,
    metadata: &PageMetadata,
    enrichment: &EnrichmentResult,
    captured_at: DateTime<Local>,
) -> String {
    let summary = enrichment
        .summary
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("No summary available")
        .replace('\n', "\n  ");

    let difficulty = enrichment
        .difficulty_level
        .map(|level| level.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut doc = String::with_capacity(enrichment.revised_content.len() + 1024);
    doc.push_str("---\n");
    doc.push_str(&format!("title: {}\n", yaml_scalar(&metadata.title)));
    doc.push_str(&format!("source: {}\n", yaml_scalar(url)));
    doc.push_str(&format!(
        "date_published: {}\n",
        yaml_scalar(metadata.publication_date.as_deref().unwrap_or("unknown"))
    ));
    doc.push_str(&format!(
        "date_captured: {}\n",
        captured_at.format("%Y-%m-%dT%H:%M:%S%.6f")
    ));
    doc.push_str(&format!("domain: {}\n", yaml_scalar(&metadata.domain)));
    doc.push_str(&format!("author: {}\n", yaml_scalar(&metadata.author)));
    doc.push_str(&format!("category: {}\n", CATEGORY));
    doc.push_str(&format!("technologies: {}\n", flow_list(&enrichment.technologies)));
    doc.push_str(&format!(
        "programming_languages: {}\n",
        flow_list(&enrichment.programming_languages)
    ));
    doc.push_str(&format!("tags: {}\n", flow_list(&enrichment.tags)));
    doc.push_str(&format!("key_concepts: {}\n", flow_list(&enrichment.key_concepts)));
    doc.push_str(&format!(
        "code_examples: {}\n",
        enrichment.code_examples.unwrap_or(false)
    ));
    doc.push_str(&format!("difficulty_level: {}\n", difficulty));
    doc.push_str(&format!("summary: |\n  {}\n", summary));
    doc.push_str("---\n\n");
    doc.push_str(&format!("# {}\n\n", metadata.title));
    doc.push_str(&enrichment.revised_content);
    doc.push('\n');
    doc
}

fn flow_list(items: &Option<Vec<String>>) -> String {
    let quoted: Vec<String> = items
        .iter()
        .flatten()
        .map(|item| format!("'{}'", item.replace('\'', "''")))
        .collect();
    format!("[{}]", quoted.join(", "))
}

// Plain scalars that would confuse a YAML reader get single-quoted.
fn yaml_scalar(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.starts_with(|c: char| "-?:,[]{}#&*!|>'\"%@`".contains(c) || c.is_whitespace())
        || value.ends_with(char::is_whitespace);

    if needs_quotes {
        format!("'{}'", value.replace('\'', "''"))
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentWriter {
    output_dir: PathBuf,
}

impl DocumentWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        DocumentWriter {
            output_dir: output_dir.into(),
        }
    }

    pub async fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    pub async fn write(
        &self,
        url: &str,
        metadata: &PageMetadata,
        enrichment: &EnrichmentResult,
    ) -> Result<PathBuf> {
        let now = Local::now();
        let output_path = self.output_dir.join(file_name_for(url, now));
        fs::write(&output_path, render_document(url, metadata, enrichment, now)).await?;
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::DifficultyLevel;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn metadata() -> PageMetadata {
        PageMetadata {
            title: "Dapper vs EF".into(),
            author: "Jane Doe".into(),
            publication_date: Some("2024-03-01".into()),
            domain: "www.example.com".into(),
            content_html: "<article></article>".into(),
        }
    }

    #[test]
    fn file_name_uses_domain_and_path() {
        let name = file_name_for("https://www.example.com/blog/2024/dapper-vs-ef/", fixed_time());
        assert_eq!(name, "example.com_blog_2024_dapper-vs-ef.md");
    }

    #[test]
    fn file_name_is_stable_and_ignores_query() {
        let a = file_name_for("https://example.com/post?page=1", fixed_time());
        let b = file_name_for("https://example.com/post?page=2", Local::now());
        assert_eq!(a, b);
        assert_eq!(a, "example.com_post.md");
    }

    #[test]
    fn empty_path_uses_timestamp() {
        let name = file_name_for("https://www.example.com/", fixed_time());
        assert_eq!(name, "example.com_20240506_070809.md");
    }

    #[test]
    fn path_is_truncated_and_sanitized() {
        let long = "a".repeat(150);
        let name = file_name_for(&format!("https://blog.dev:8080/{}", long), fixed_time());
        assert_eq!(name, format!("blog.dev_8080_{}.md", "a".repeat(100)));

        let name = file_name_for("https://example.com/c%2B%2B/why+not", fixed_time());
        assert_eq!(name, "example.com_c_2B_2B_why_not.md");
    }

    #[test]
    fn non_ascii_path_is_kept_verbatim() {
        let name = file_name_for("https://example.com/blog/café", fixed_time());
        assert_eq!(name, "example.com_blog_café.md");

        let long = "é".repeat(120);
        let name = file_name_for(&format!("https://example.com/{}", long), fixed_time());
        assert_eq!(name, format!("example.com_{}.md", "é".repeat(100)));
    }

    #[test]
    fn dot_segments_are_not_collapsed() {
        let name = file_name_for("https://Example.com/a/../b", fixed_time());
        assert_eq!(name, "example.com_a_.._b.md");

        let name = file_name_for("https://example.com/docs/./intro#setup", fixed_time());
        assert_eq!(name, "example.com_docs_._intro.md");
    }

    #[test]
    fn renders_front_matter_and_body() {
        let enrichment = EnrichmentResult {
            technologies: Some(vec!["Dapper".into(), "Entity Framework".into()]),
            programming_languages: Some(vec!["C#".into()]),
            tags: Some(vec![]),
            key_concepts: None,
            code_examples: Some(true),
            difficulty_level: Some(DifficultyLevel::Advanced),
            summary: Some("First line.\nSecond line.".into()),
            revised_content: "Body here.".into(),
        };

        let doc = render_document(
            "https://www.example.com/dapper",
            &metadata(),
            &enrichment,
            fixed_time(),
        );

        let expected = "---
title: Dapper vs EF
source: https://www.example.com/dapper
date_published: 2024-03-01
date_captured: 2024-05-06T07:08:09.000000
domain: www.example.com
author: Jane Doe
category: programming
technologies: ['Dapper', 'Entity Framework']
programming_languages: ['C#']
tags: []
key_concepts: []
code_examples: true
difficulty_level: advanced
summary: |
  First line.
  Second line.
---

# Dapper vs EF

Body here.
";
        assert_eq!(doc, expected);
    }

    #[test]
    fn missing_enrichment_fields_use_defaults() {
        let mut meta = metadata();
        meta.publication_date = None;
        meta.title = "Rust: the book".into();
        let enrichment = EnrichmentResult {
            revised_content: "x".into(),
            ..EnrichmentResult::default()
        };

        let doc = render_document("https://a.dev/p", &meta, &enrichment, fixed_time());
        assert!(doc.contains("title: 'Rust: the book'\n"));
        assert!(doc.contains("date_published: unknown\n"));
        assert!(doc.contains("code_examples: false\n"));
        assert!(doc.contains("difficulty_level: unknown\n"));
        assert!(doc.contains("summary: |\n  No summary available\n"));
        assert!(doc.contains("\n# Rust: the book\n\nx\n"));
    }

    #[tokio::test]
    async fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DocumentWriter::new(dir.path().join("docs"));
        writer.ensure_output_dir().await.unwrap();

        let mut enrichment = EnrichmentResult {
            revised_content: "first".into(),
            ..EnrichmentResult::default()
        };
        let first = writer.write("https://a.dev/post", &metadata(), &enrichment).await.unwrap();
        enrichment.revised_content = "second".into();
        let second = writer.write("https://a.dev/post", &metadata(), &enrichment).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, dir.path().join("docs").join("a.dev_post.md"));
        let contents = std::fs::read_to_string(&second).unwrap();
        assert!(contents.ends_with("second\n"));
    }
}
