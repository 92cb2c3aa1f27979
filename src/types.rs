use chrono::DateTime;
use chrono_tz::Tz;

/// Timezone every pipeline timestamp is normalized to.
pub const JST: Tz = chrono_tz::Asia::Tokyo;

/// A feed entry before enrichment: what the feed itself tells us about a story.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    pub title: String,
    pub link: String,
    pub site_name: String,
    /// Publish time normalized to JST. Feeds frequently omit this; items
    /// without it are dropped by the time window filter.
    pub published: Option<DateTime<Tz>>,
}

/// What article extraction returns for a single page.
#[derive(Debug, Clone)]
pub struct ArticleContent {
    pub title: String,
    pub text: String,
    pub html: String,
    pub top_image: String,
}

/// An enriched article that passed the time window filter.
///
/// Immutable once built: deduplication and the quality flow only read it.
#[derive(Debug, Clone)]
pub struct OutputRecord {
    /// Scraped title, falling back to the feed title when extraction found none.
    pub title: String,
    pub url: String,
    pub site_name: String,
    pub published: DateTime<Tz>,
    pub text: String,
    pub html: String,
    /// Lead image URL, possibly empty.
    pub top_image: String,
    pub text_length: usize,
}

/// Payload offered to the notification dispatcher. Built only for records
/// the quality flow judged worth sending.
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    pub title: String,
    pub site_name: String,
    pub url: String,
    pub top_image: String,
    pub summary: String,
    pub keywords: Vec<String>,
}

/// Per-notification delivery result. Logged, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(DeliveryFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryFailure {
    /// The endpoint kept rate limiting us until the retry budget ran out.
    RateLimited,
    /// Connectivity or timeout trouble that retries did not fix.
    Transport(String),
    /// A non-retryable HTTP error status from the endpoint.
    Api { status: u16, message: String },
    /// Anything else; abandoned without retrying.
    Unexpected(String),
    /// Retry budget of zero, nothing was ever attempted.
    RetriesExhausted,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Article extraction error: {0}")]
    Extraction(String),

    #[error("Quality flow error: {0}")]
    Flow(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NotifierError>;
