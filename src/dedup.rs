use crate::types::OutputRecord;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Build the comparison key for a title: NFKC fold (so fullwidth and
/// halfwidth forms compare equal), lowercase, collapse whitespace runs,
/// trim. An empty result means the title cannot be used as a key.
pub fn normalize_title(title: &str) -> String {
    let folded: String = title.nfkc().collect();
    folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DedupKey {
    Title(String),
    /// Items with no usable title are never merged with each other; each is
    /// keyed by its URL and publish time so distinct stories stay distinct.
    Untitled { url: String, published_ms: i64 },
}

/// Collapses cross-posted stories with equivalent normalized titles into a
/// single record, preferring the earliest publish time.
pub struct TitleDeduplicator;

impl TitleDeduplicator {
    /// Among duplicates the earliest published record wins; an exact
    /// timestamp tie keeps the first one encountered. The result is sorted
    /// ascending by publish time, which downstream batch delivery relies on.
    pub fn dedup(records: Vec<OutputRecord>) -> Vec<OutputRecord> {
        let total = records.len();
        let mut retained: Vec<(DedupKey, OutputRecord)> = Vec::new();

        for record in records {
            let key = Self::key_for(&record);
            match retained.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, kept)) => {
                    if record.published < kept.published {
                        debug!(
                            kept = %record.title,
                            dropped = %kept.title,
                            "replacing duplicate with earlier item"
                        );
                        *kept = record;
                    } else {
                        debug!(dropped = %record.title, "dropping later duplicate");
                    }
                }
                None => retained.push((key, record)),
            }
        }

        let mut out: Vec<OutputRecord> = retained.into_iter().map(|(_, record)| record).collect();
        // Stable sort: equal timestamps keep encounter order.
        out.sort_by(|a, b| a.published.cmp(&b.published));

        if out.len() < total {
            debug!(removed = total - out.len(), "removed duplicate records");
        }
        out
    }

    fn key_for(record: &OutputRecord) -> DedupKey {
        let normalized = normalize_title(&record.title);
        if normalized.is_empty() {
            DedupKey::Untitled {
                url: record.url.clone(),
                published_ms: record.published.timestamp_millis(),
            }
        } else {
            DedupKey::Title(normalized)
        }
    }
}
