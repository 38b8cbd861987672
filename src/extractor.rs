use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const UNKNOWN_AUTHOR: &str = "Unknown";

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("Failed to parse selector {css}: {e:?}"))
}

// Create static selectors to avoid recompiling them each time
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("title"));

static AUTHOR_META_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector(r#"meta[name="author"]"#),
        selector(r#"meta[property="article:author"]"#),
    ]
});

static CLASSED_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("[class]"));
static ITEMPROP_AUTHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| selector(r#"[itemprop="author"]"#));
static AUTHOR_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)author").expect("valid regex"));

static DATE_META_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector(r#"meta[property="article:published_time"]"#),
        selector(r#"meta[name="publish_date"]"#),
        selector(r#"meta[property="og:published_time"]"#),
    ]
});

static TIME_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));

static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    vec![
        selector("main"),
        selector("article"),
        selector(r#"[role="main"]"#),
        selector("body"),
    ]
});

/// Structural metadata recovered from a fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMetadata {
    pub title: String,
    pub author: String,
    pub publication_date: Option<String>,
    pub domain: String,
    pub content_html: String,
}

pub fn extract_metadata(html: &str, url: &str) -> PageMetadata {
    let document = Html::parse_document(html);
    let domain = network_location(url);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| domain.clone());

    let author = first_meta_content(&document, &AUTHOR_META_SELECTORS)
        .or_else(|| author_from_elements(&document))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let publication_date = first_meta_content(&document, &DATE_META_SELECTORS).or_else(|| {
        document
            .select(&TIME_SELECTOR)
            .filter_map(|element| element.value().attr("datetime"))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(str::to_string)
    });

    let content_html = CONTENT_SELECTORS
        .iter()
        .find_map(|sel| document.select(sel).next())
        .map(|element| element.html())
        .unwrap_or_else(|| html.to_string());

    PageMetadata {
        title,
        author,
        publication_date,
        domain,
        content_html,
    }
}

pub fn network_location(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

fn first_meta_content(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        document
            .select(sel)
            .filter_map(|element| element.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string)
    })
}

fn author_from_elements(document: &Html) -> Option<String> {
    let by_class = document.select(&CLASSED_SELECTOR).find(|element| {
        element
            .value()
            .attr("class")
            .is_some_and(|class| AUTHOR_CLASS.is_match(class))
    });

    by_class
        .and_then(visible_text)
        .or_else(|| document.select(&ITEMPROP_AUTHOR_SELECTOR).next().and_then(visible_text))
}

fn visible_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}
