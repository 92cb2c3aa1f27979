use crate::config::Config;
use crate::dedup::TitleDeduplicator;
use crate::enrich::{ArticleEnricher, HttpArticleEnricher};
use crate::fetcher::{FetchConfig, Fetcher};
use crate::filter::TimeWindowFilter;
use crate::flow::{OpenAiFlow, QualityFlow};
use crate::notify::{DiscordWebhook, NotificationDispatcher};
use crate::source::{FeedSource, HttpFeedSource};
use crate::types::{
    CandidateItem, DeliveryOutcome, NotificationRequest, NotifierError, OutputRecord, Result, JST,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What a single run did, for logging and assertions.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Deduplicated records that entered the quality flow stage.
    pub records: usize,
    /// Notifications accepted by the judge.
    pub notifications: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl RunSummary {
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DeliveryOutcome::Delivered))
            .count()
    }
}

/// Runs the whole feed-to-notification sequence once per invocation.
pub struct NewsPipeline {
    sources: Vec<Box<dyn FeedSource>>,
    enricher: Box<dyn ArticleEnricher>,
    flow: Box<dyn QualityFlow>,
    dispatcher: NotificationDispatcher,
    offset_hours: i64,
}

impl NewsPipeline {
    pub fn new(
        sources: Vec<Box<dyn FeedSource>>,
        enricher: Box<dyn ArticleEnricher>,
        flow: Box<dyn QualityFlow>,
        dispatcher: NotificationDispatcher,
        offset_hours: i64,
    ) -> Result<Self> {
        if offset_hours < 1 {
            return Err(NotifierError::Config(format!(
                "offset must be greater than or equal to 1, got {offset_hours}"
            )));
        }
        if sources.is_empty() {
            return Err(NotifierError::Config("no feeds configured".to_string()));
        }
        Ok(Self {
            sources,
            enricher,
            flow,
            dispatcher,
            offset_hours,
        })
    }

    /// Wire up the real collaborators from configuration. The OpenAI key
    /// comes from `OPENAI_API_KEY`.
    pub fn from_config(config: &Config, offset_hours: i64) -> Result<Self> {
        config.validate()?;

        let fetcher = Arc::new(Fetcher::new(FetchConfig::default())?);
        let sources: Vec<Box<dyn FeedSource>> = config
            .feeds
            .iter()
            .map(|feed| {
                Box::new(HttpFeedSource::new(feed, Arc::clone(&fetcher))) as Box<dyn FeedSource>
            })
            .collect();
        let enricher = Box::new(HttpArticleEnricher::new(Arc::clone(&fetcher)));

        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| NotifierError::Config("OPENAI_API_KEY is not set".to_string()))?;
        let flow = Box::new(OpenAiFlow::new(config.ai.clone(), api_key));

        let discord = config.notifications.discord.clone();
        let webhook = Box::new(DiscordWebhook::new(&discord.webhook_url)?);
        let dispatcher = NotificationDispatcher::new(discord, webhook);

        Self::new(sources, enricher, flow, dispatcher, offset_hours)
    }

    pub async fn run(&self) -> Result<RunSummary> {
        self.run_at(Utc::now().with_timezone(&JST)).await
    }

    /// Run with an explicit reference instant. Every per-feed cutoff derives
    /// from this one instant, so feeds processed late in the run see the
    /// same window as the first one.
    pub async fn run_at(&self, run_time: DateTime<Tz>) -> Result<RunSummary> {
        let filter = TimeWindowFilter::new(run_time, self.offset_hours)?;
        info!(run_time = %run_time, cutoff = %filter.cutoff(), feeds = self.sources.len(), "starting run");

        let mut records = Vec::new();
        for source in &self.sources {
            match self.collect_feed(source.as_ref(), &filter).await {
                Ok(mut feed_records) => records.append(&mut feed_records),
                // A bad feed never takes the rest of the run down with it.
                Err(e) => error!(feed = source.site_name(), error = %e, "failed to process feed"),
            }
        }

        let records = TitleDeduplicator::dedup(records);
        info!(records = records.len(), "records after deduplication");

        let mut notifications = Vec::new();
        for record in &records {
            if record.text.is_empty() {
                debug!(title = %record.title, "skipping record with no text");
                continue;
            }
            let assessment = self.flow.assess(&record.text).await?;
            if assessment.is_high_quality {
                notifications.push(NotificationRequest {
                    title: record.title.clone(),
                    site_name: record.site_name.clone(),
                    url: record.url.clone(),
                    top_image: record.top_image.clone(),
                    summary: assessment.summary,
                    keywords: assessment.keywords,
                });
            } else {
                debug!(title = %record.title, "judged low quality");
            }
        }

        let outcomes = if notifications.is_empty() {
            info!("no notifications to send");
            Vec::new()
        } else {
            self.dispatcher.dispatch(&notifications).await
        };

        Ok(RunSummary {
            records: records.len(),
            notifications: notifications.len(),
            outcomes,
        })
    }

    async fn collect_feed(
        &self,
        source: &dyn FeedSource,
        filter: &TimeWindowFilter,
    ) -> Result<Vec<OutputRecord>> {
        let items = source.fetch().await?;
        let total = items.len();
        let items = filter.retain(items);
        debug!(feed = source.site_name(), kept = items.len(), total, "feed filtered");

        let mut records = Vec::new();
        for item in items {
            if let Some(record) = self.build_record(item).await {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Enrich one candidate. Any failure drops the item with a warning and
    /// never aborts the run.
    async fn build_record(&self, item: CandidateItem) -> Option<OutputRecord> {
        let published = match item.published {
            Some(published) => published,
            None => {
                warn!(url = %item.link, "candidate lost its publish time, dropping");
                return None;
            }
        };

        let article = match self.enricher.enrich(&item.link, "ja").await {
            Ok(article) => article,
            Err(e) => {
                warn!(url = %item.link, error = %e, "failed to fetch article");
                return None;
            }
        };

        let title = if article.title.is_empty() {
            item.title
        } else {
            article.title
        };
        let text_length = article.text.chars().count();

        Some(OutputRecord {
            title,
            url: item.link,
            site_name: item.site_name,
            published,
            text: article.text,
            html: article.html,
            top_image: article.top_image,
            text_length,
        })
    }
}
