use crate::types::{NotifierError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// One syndication feed to poll.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

/// Discord webhook delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    /// Pause between consecutive sends, in seconds.
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay: f64,
    /// Fallback wait before a retry when the endpoint gives no Retry-After.
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f64,
    /// Total attempts per notification, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_rate_limit_delay() -> f64 {
    0.4
}

fn default_retry_delay() -> f64 {
    1.0
}

fn default_max_retries() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    pub discord: DiscordConfig,
}

/// Model settings for one LLM stage.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub summarize: ModelConfig,
    pub judge: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feeds: Vec<FeedConfig>,
    pub notifications: NotificationConfig,
    pub ai: AiConfig,
}

impl Config {
    /// Load and validate a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading configuration");
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)
            .map_err(|e| NotifierError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on anything that would make the run pointless. Runs before
    /// any feed is touched.
    pub fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            return Err(NotifierError::Config("no feeds configured".to_string()));
        }
        let discord = &self.notifications.discord;
        if discord.webhook_url.trim().is_empty() {
            return Err(NotifierError::Config(
                "Discord webhook URL is not configured".to_string(),
            ));
        }
        if discord.rate_limit_delay < 0.0 || discord.retry_delay < 0.0 {
            return Err(NotifierError::Config(
                "delivery delays must not be negative".to_string(),
            ));
        }
        if discord.max_retries < 1 {
            return Err(NotifierError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
