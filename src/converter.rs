use htmd::HtmlToMarkdown;
use tracing::warn;

pub fn html_to_markdown(html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "noscript"])
        .build();

    match converter.convert(html) {
        Ok(markdown) => markdown,
        Err(e) => {
            warn!("Failed to convert HTML to Markdown: {}", e);
            String::new()
        }
    }
}
