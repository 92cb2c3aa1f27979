use crate::config::FeedConfig;
use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::types::{CandidateItem, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// A source of candidate items. The pipeline only cares about this seam;
/// tests substitute in-memory sources for real feeds.
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn site_name(&self) -> &str;

    /// Fetch and parse the feed. A failure here aborts this feed only.
    async fn fetch(&self) -> Result<Vec<CandidateItem>>;
}

/// Syndication feed pulled over HTTP.
pub struct HttpFeedSource {
    name: String,
    url: String,
    fetcher: Arc<Fetcher>,
}

impl HttpFeedSource {
    pub fn new(config: &FeedConfig, fetcher: Arc<Fetcher>) -> Self {
        Self {
            name: config.name.clone(),
            url: config.url.clone(),
            fetcher,
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    fn site_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<CandidateItem>> {
        debug!(feed = %self.name, url = %self.url, "pulling feed");
        let body = self.fetcher.fetch_text(&self.url).await?;
        FeedParser::parse(&body, &self.name)
    }
}
