pub mod config;
pub mod dedup;
pub mod enrich;
pub mod fetcher;
pub mod filter;
pub mod flow;
pub mod notify;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod types;

pub use config::{AiConfig, Config, DiscordConfig, FeedConfig, ModelConfig};
pub use dedup::{normalize_title, TitleDeduplicator};
pub use enrich::{ArticleEnricher, HttpArticleEnricher};
pub use fetcher::{FetchConfig, Fetcher};
pub use filter::TimeWindowFilter;
pub use flow::{Assessment, MockQualityFlow, OpenAiFlow, QualityFlow};
pub use notify::{embed_payload, DiscordWebhook, NotificationDispatcher, Webhook, WebhookResponse};
pub use parser::FeedParser;
pub use pipeline::{NewsPipeline, RunSummary};
pub use source::{FeedSource, HttpFeedSource};
pub use types::*;
