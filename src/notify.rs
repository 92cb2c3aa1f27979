use crate::config::DiscordConfig;
use crate::types::{
    DeliveryFailure, DeliveryOutcome, NotificationRequest, NotifierError, Result,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Embed accent color, carried over from the original notifier.
const ACCENT_COLOR: u32 = 0x009999;

/// One delivery attempt as the dispatcher sees it. Transport trouble is a
/// value, not an `Err`, so the retry policy can be exercised without a
/// network; `Err` from [`Webhook::post`] means something unexpected and is
/// never retried.
#[derive(Debug, Clone)]
pub enum WebhookResponse {
    Delivered,
    /// HTTP 429 with the endpoint-specified wait, when it gave one (seconds).
    RateLimited { retry_after: Option<f64> },
    /// Any other error status; not retryable.
    ApiError { status: u16, message: String },
    /// Connectivity or timeout failure; retryable.
    TransportError(String),
}

#[async_trait]
pub trait Webhook: Send + Sync {
    async fn post(&self, payload: &serde_json::Value) -> Result<WebhookResponse>;
}

/// Discord incoming-webhook endpoint.
pub struct DiscordWebhook {
    url: String,
    http: reqwest::Client,
}

impl DiscordWebhook {
    pub fn new(url: &str) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(NotifierError::Config(
                "Discord webhook URL is not configured".to_string(),
            ));
        }
        Ok(Self {
            url: url.to_string(),
            http: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl Webhook for DiscordWebhook {
    async fn post(&self, payload: &serde_json::Value) -> Result<WebhookResponse> {
        let response = match self.http.post(&self.url).json(payload).send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                return Ok(WebhookResponse::TransportError(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(WebhookResponse::Delivered);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            // Discord reports the wait both as a Retry-After header and as a
            // `retry_after` field (seconds) in the JSON body.
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<f64>().ok());
            let retry_after = match retry_after {
                Some(seconds) => Some(seconds),
                None => response
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|body| body.get("retry_after").and_then(|v| v.as_f64())),
            };
            return Ok(WebhookResponse::RateLimited { retry_after });
        }

        let message = response.text().await.unwrap_or_default();
        Ok(WebhookResponse::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

/// Build the Discord embed for one notification.
pub fn embed_payload(request: &NotificationRequest) -> serde_json::Value {
    let mut embed = json!({
        "title": request.title,
        "url": request.url,
        "description": request.summary,
        "color": ACCENT_COLOR,
        "author": { "name": request.site_name },
        "fields": [
            { "name": "キーワード", "value": request.keywords.join(", ") },
        ],
    });

    if request.top_image.starts_with("http") {
        embed["image"] = json!({ "url": request.top_image });
    }

    json!({ "embeds": [embed] })
}

/// Delivers a batch of notifications one at a time, in order, pacing sends
/// and retrying per item. One item failing never aborts the batch.
pub struct NotificationDispatcher {
    webhook: Box<dyn Webhook>,
    config: DiscordConfig,
}

impl NotificationDispatcher {
    pub fn new(config: DiscordConfig, webhook: Box<dyn Webhook>) -> Self {
        Self { webhook, config }
    }

    /// Returns one outcome per request, in request order.
    pub async fn dispatch(&self, requests: &[NotificationRequest]) -> Vec<DeliveryOutcome> {
        let total = requests.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, request) in requests.iter().enumerate() {
            let outcome = self.deliver(request).await;
            match &outcome {
                DeliveryOutcome::Delivered => {
                    info!(sent = index + 1, total, title = %request.title, "sent notification");
                    if index + 1 < total {
                        tokio::time::sleep(Duration::from_secs_f64(self.config.rate_limit_delay))
                            .await;
                    }
                }
                DeliveryOutcome::Failed(reason) => {
                    error!(
                        sent = index + 1,
                        total,
                        title = %request.title,
                        ?reason,
                        "failed to send notification"
                    );
                }
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn deliver(&self, request: &NotificationRequest) -> DeliveryOutcome {
        let payload = embed_payload(request);
        let mut last_failure = None;

        for attempt in 1..=self.config.max_retries {
            match self.webhook.post(&payload).await {
                Ok(WebhookResponse::Delivered) => {
                    debug!(title = %request.title, attempt, "delivered");
                    return DeliveryOutcome::Delivered;
                }
                Ok(WebhookResponse::RateLimited { retry_after }) => {
                    let delay = retry_after.unwrap_or(self.config.retry_delay);
                    warn!(
                        attempt,
                        max_retries = self.config.max_retries,
                        delay,
                        title = %request.title,
                        "rate limited by webhook"
                    );
                    last_failure = Some(DeliveryFailure::RateLimited);
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(Duration::from_secs_f64(delay.max(0.0))).await;
                    }
                }
                Ok(WebhookResponse::TransportError(message)) => {
                    warn!(attempt, error = %message, "transport error while sending");
                    last_failure = Some(DeliveryFailure::Transport(message));
                    if attempt < self.config.max_retries {
                        tokio::time::sleep(Duration::from_secs_f64(self.config.retry_delay))
                            .await;
                    }
                }
                Ok(WebhookResponse::ApiError { status, message }) => {
                    return DeliveryOutcome::Failed(DeliveryFailure::Api { status, message });
                }
                Err(e) => {
                    return DeliveryOutcome::Failed(DeliveryFailure::Unexpected(e.to_string()));
                }
            }
        }

        error!(
            title = %request.title,
            attempts = self.config.max_retries,
            "giving up on notification"
        );
        DeliveryOutcome::Failed(last_failure.unwrap_or(DeliveryFailure::RetriesExhausted))
    }
}
