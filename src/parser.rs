use crate::types::{CandidateItem, NotifierError, Result, JST};
use feed_rs::parser;
use tracing::debug;

/// Converts raw RSS/Atom content into candidate items for one site.
pub struct FeedParser;

impl FeedParser {
    pub fn parse(content: &str, site_name: &str) -> Result<Vec<CandidateItem>> {
        let feed = parser::parse(content.as_bytes())
            .map_err(|e| NotifierError::Parse(format!("failed to parse feed: {e}")))?;

        let mut items = Vec::new();
        for entry in feed.entries {
            if let Some(item) = Self::to_candidate(entry, site_name) {
                items.push(item);
            }
        }

        debug!(site = site_name, entries = items.len(), "parsed feed");
        Ok(items)
    }

    fn to_candidate(entry: feed_rs::model::Entry, site_name: &str) -> Option<CandidateItem> {
        // Entries without a link cannot be enriched; skip them outright.
        let link = entry.links.first()?.href.clone();
        let title = entry.title.map(|t| t.content).unwrap_or_default();
        // Missing publish dates are kept as None and left to the time filter.
        let published = entry.published.map(|dt| dt.with_timezone(&JST));

        Some(CandidateItem {
            title,
            link,
            site_name: site_name.to_string(),
            published,
        })
    }
}
