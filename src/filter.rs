use crate::types::{CandidateItem, NotifierError, Result};
use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use tracing::debug;

/// Decides whether a candidate item falls inside the processing window.
///
/// The cutoff is derived once from a single run instant, so every feed in a
/// run sees the same window no matter how late in the run it is processed.
#[derive(Debug, Clone)]
pub struct TimeWindowFilter {
    cutoff: DateTime<Tz>,
}

impl TimeWindowFilter {
    /// `offset_hours` must be at least 1; anything else is a configuration
    /// error and fails before any feed is fetched.
    pub fn new(run_time: DateTime<Tz>, offset_hours: i64) -> Result<Self> {
        if offset_hours < 1 {
            return Err(NotifierError::Config(format!(
                "offset must be greater than or equal to 1, got {offset_hours}"
            )));
        }
        Ok(Self {
            cutoff: run_time - Duration::hours(offset_hours),
        })
    }

    pub fn cutoff(&self) -> DateTime<Tz> {
        self.cutoff
    }

    /// Items without a publish time are dropped silently; the boundary
    /// `published == cutoff` is kept.
    pub fn is_in_window(&self, item: &CandidateItem) -> bool {
        match item.published {
            Some(published) => published >= self.cutoff,
            None => false,
        }
    }

    pub fn retain(&self, items: Vec<CandidateItem>) -> Vec<CandidateItem> {
        let total = items.len();
        let kept: Vec<CandidateItem> = items
            .into_iter()
            .filter(|item| self.is_in_window(item))
            .collect();
        debug!(kept = kept.len(), total, cutoff = %self.cutoff, "applied time window");
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JST;
    use chrono::TimeZone;

    fn item(published: Option<DateTime<Tz>>) -> CandidateItem {
        CandidateItem {
            title: "story".to_string(),
            link: "https://example.com/story".to_string(),
            site_name: "Example".to_string(),
            published,
        }
    }

    fn jst(h: u32, m: u32) -> DateTime<Tz> {
        JST.with_ymd_and_hms(2024, 6, 1, h, m, 0).unwrap()
    }

    #[test]
    fn rejects_offset_below_one() {
        assert!(TimeWindowFilter::new(jst(12, 0), 0).is_err());
        assert!(TimeWindowFilter::new(jst(12, 0), -3).is_err());
        assert!(TimeWindowFilter::new(jst(12, 0), 1).is_ok());
    }

    #[test]
    fn drops_items_without_timestamp() {
        let filter = TimeWindowFilter::new(jst(12, 0), 1).unwrap();
        assert!(!filter.is_in_window(&item(None)));
    }

    #[test]
    fn keeps_items_at_or_after_cutoff() {
        let filter = TimeWindowFilter::new(jst(12, 0), 2).unwrap();

        // Cutoff is 10:00; the boundary itself is inside the window.
        assert!(filter.is_in_window(&item(Some(jst(10, 0)))));
        assert!(filter.is_in_window(&item(Some(jst(11, 30)))));
        assert!(!filter.is_in_window(&item(Some(jst(9, 59)))));
    }

    #[test]
    fn retain_filters_a_batch() {
        let filter = TimeWindowFilter::new(jst(12, 0), 1).unwrap();
        let items = vec![
            item(Some(jst(11, 30))),
            item(None),
            item(Some(jst(10, 0))),
            item(Some(jst(11, 0))),
        ];

        let kept = filter.retain(items);
        assert_eq!(kept.len(), 2);
    }
}
