use crate::fetcher::Fetcher;
use crate::types::{ArticleContent, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::debug;

/// Fetches the full article behind a candidate item. Failures are non-fatal
/// at the orchestrator: the item is dropped with a warning.
#[async_trait]
pub trait ArticleEnricher: Send + Sync {
    async fn enrich(&self, url: &str, language: &str) -> Result<ArticleContent>;
}

/// Scrapes article pages over HTTP: title and lead image from OpenGraph
/// metadata, body text from paragraph elements.
pub struct HttpArticleEnricher {
    fetcher: Arc<Fetcher>,
}

impl HttpArticleEnricher {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl ArticleEnricher for HttpArticleEnricher {
    async fn enrich(&self, url: &str, _language: &str) -> Result<ArticleContent> {
        let html = self.fetcher.fetch_text(url).await?;
        let mut content = extract_article(&html);
        content.top_image = absolutize_image(url, &content.top_image);
        debug!(url, text_length = content.text.chars().count(), "extracted article");
        Ok(content)
    }
}

/// Some sites publish og:image as a path; resolve it against the article
/// URL so the notification embed gets a usable absolute URL.
fn absolutize_image(article_url: &str, image: &str) -> String {
    if image.is_empty() || image.starts_with("http") {
        return image.to_string();
    }
    match url::Url::parse(article_url).and_then(|base| base.join(image)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => image.to_string(),
    }
}

/// Pull the interesting parts out of an article page. Kept synchronous so
/// the non-Send `Html` DOM never crosses an await point.
fn extract_article(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let title = meta_content(&document, "meta[property=\"og:title\"]")
        .or_else(|| {
            let selector = Selector::parse("title").unwrap();
            document
                .select(&selector)
                .next()
                .map(|t| t.text().collect::<String>())
        })
        .unwrap_or_default()
        .trim()
        .to_string();

    let top_image = meta_content(&document, "meta[property=\"og:image\"]").unwrap_or_default();

    // Prefer paragraphs scoped to an <article> element; fall back to the
    // whole page when the markup has none.
    let text = paragraph_text(&document, "article p");
    let text = if text.is_empty() {
        paragraph_text(&document, "p")
    } else {
        text
    };

    ArticleContent {
        title,
        text,
        html: html.to_string(),
        top_image,
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn paragraph_text(document: &Html, selector: &str) -> String {
    let selector = Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .map(|p| p.text().collect::<String>())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"<!DOCTYPE html>
        <html>
          <head>
            <title>Fallback title</title>
            <meta property="og:title" content="Scraped title" />
            <meta property="og:image" content="https://example.com/lead.jpg" />
          </head>
          <body>
            <article>
              <p>First paragraph.</p>
              <p>Second paragraph.</p>
            </article>
            <p>Footer junk outside the article.</p>
          </body>
        </html>"#;

    #[test]
    fn extracts_title_image_and_article_text() {
        let content = extract_article(SAMPLE_PAGE);

        assert_eq!(content.title, "Scraped title");
        assert_eq!(content.top_image, "https://example.com/lead.jpg");
        assert_eq!(content.text, "First paragraph.\n\nSecond paragraph.");
        assert!(content.html.contains("og:image"));
    }

    #[test]
    fn falls_back_to_title_tag_and_body_paragraphs() {
        let page = "<html><head><title> Plain title </title></head>\
                    <body><p>Only paragraph.</p></body></html>";
        let content = extract_article(page);

        assert_eq!(content.title, "Plain title");
        assert_eq!(content.text, "Only paragraph.");
        assert!(content.top_image.is_empty());
    }

    #[test]
    fn empty_page_yields_empty_content() {
        let content = extract_article("<html><body></body></html>");
        assert!(content.title.is_empty());
        assert!(content.text.is_empty());
    }

    #[test]
    fn relative_lead_image_is_resolved_against_the_article() {
        assert_eq!(
            absolutize_image("https://example.com/news/story", "/img/lead.jpg"),
            "https://example.com/img/lead.jpg"
        );
        assert_eq!(
            absolutize_image("https://example.com/news/story", "https://cdn.example/x.jpg"),
            "https://cdn.example/x.jpg"
        );
        assert_eq!(absolutize_image("https://example.com/", ""), "");
    }
}
