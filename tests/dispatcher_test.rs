use async_trait::async_trait;
use rss_notifier::{
    DeliveryFailure, DeliveryOutcome, DiscordConfig, NotificationDispatcher, NotificationRequest,
    NotifierError, Webhook, WebhookResponse,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Webhook double that replays a script of responses and counts attempts.
/// Once the script runs dry it keeps answering with `fallback`.
struct ScriptedWebhook {
    script: Mutex<VecDeque<Result<WebhookResponse, NotifierError>>>,
    fallback: WebhookResponse,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedWebhook {
    fn new(
        script: Vec<Result<WebhookResponse, NotifierError>>,
        fallback: WebhookResponse,
    ) -> (Self, Arc<AtomicUsize>) {
        let attempts = Arc::new(AtomicUsize::new(0));
        let webhook = Self {
            script: Mutex::new(script.into()),
            fallback,
            attempts: Arc::clone(&attempts),
        };
        (webhook, attempts)
    }
}

#[async_trait]
impl Webhook for ScriptedWebhook {
    async fn post(
        &self,
        _payload: &serde_json::Value,
    ) -> Result<WebhookResponse, NotifierError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.clone()),
        }
    }
}

fn zero_delay_config() -> DiscordConfig {
    DiscordConfig {
        webhook_url: "https://discord.com/api/webhooks/1/abc".to_string(),
        rate_limit_delay: 0.0,
        retry_delay: 0.0,
        max_retries: 3,
    }
}

fn request(title: &str) -> NotificationRequest {
    NotificationRequest {
        title: title.to_string(),
        site_name: "Example".to_string(),
        url: format!("https://example.com/{title}"),
        top_image: String::new(),
        summary: "summary".to_string(),
        keywords: vec!["news".to_string()],
    }
}

#[tokio::test]
async fn permanent_error_does_not_abort_the_batch() {
    let (webhook, attempts) = ScriptedWebhook::new(
        vec![
            Ok(WebhookResponse::Delivered),
            Ok(WebhookResponse::ApiError {
                status: 400,
                message: "bad embed".to_string(),
            }),
            Ok(WebhookResponse::Delivered),
        ],
        WebhookResponse::Delivered,
    );
    let dispatcher = NotificationDispatcher::new(zero_delay_config(), Box::new(webhook));

    let outcomes = dispatcher
        .dispatch(&[request("one"), request("two"), request("three")])
        .await;

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0], DeliveryOutcome::Delivered);
    assert!(matches!(
        outcomes[1],
        DeliveryOutcome::Failed(DeliveryFailure::Api { status: 400, .. })
    ));
    assert_eq!(outcomes[2], DeliveryOutcome::Delivered);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn permanent_rate_limiting_stops_after_max_retries() {
    let (webhook, attempts) = ScriptedWebhook::new(
        Vec::new(),
        WebhookResponse::RateLimited {
            retry_after: Some(0.0),
        },
    );
    let dispatcher = NotificationDispatcher::new(zero_delay_config(), Box::new(webhook));

    let outcomes = dispatcher.dispatch(&[request("stuck")]).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0],
        DeliveryOutcome::Failed(DeliveryFailure::RateLimited)
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn transient_transport_error_is_retried_then_succeeds() {
    let (webhook, attempts) = ScriptedWebhook::new(
        vec![Ok(WebhookResponse::TransportError(
            "connection reset".to_string(),
        ))],
        WebhookResponse::Delivered,
    );
    let dispatcher = NotificationDispatcher::new(zero_delay_config(), Box::new(webhook));

    let outcomes = dispatcher.dispatch(&[request("flaky")]).await;

    assert_eq!(outcomes, vec![DeliveryOutcome::Delivered]);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn transport_exhaustion_reports_the_last_error() {
    let (webhook, attempts) = ScriptedWebhook::new(
        Vec::new(),
        WebhookResponse::TransportError("connection reset".to_string()),
    );
    let dispatcher = NotificationDispatcher::new(zero_delay_config(), Box::new(webhook));

    let outcomes = dispatcher.dispatch(&[request("down")]).await;

    assert!(matches!(
        &outcomes[0],
        DeliveryOutcome::Failed(DeliveryFailure::Transport(message))
            if message == "connection reset"
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unexpected_error_abandons_the_item_without_retry() {
    let (webhook, attempts) = ScriptedWebhook::new(
        vec![Err(NotifierError::Flow("boom".to_string()))],
        WebhookResponse::Delivered,
    );
    let dispatcher = NotificationDispatcher::new(zero_delay_config(), Box::new(webhook));

    let outcomes = dispatcher
        .dispatch(&[request("doomed"), request("fine")])
        .await;

    assert!(matches!(
        outcomes[0],
        DeliveryOutcome::Failed(DeliveryFailure::Unexpected(_))
    ));
    assert_eq!(outcomes[1], DeliveryOutcome::Delivered);
    // One attempt for the abandoned item, one for the item after it.
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_batch_returns_no_outcomes() {
    let (webhook, attempts) = ScriptedWebhook::new(Vec::new(), WebhookResponse::Delivered);
    let dispatcher = NotificationDispatcher::new(zero_delay_config(), Box::new(webhook));

    let outcomes = dispatcher.dispatch(&[]).await;

    assert!(outcomes.is_empty());
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
}
