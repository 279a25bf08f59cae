use async_trait::async_trait;
use pinion_core::Notifier;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts alerts to a configured webhook.
///
/// Strictly fire-and-forget: delivery failures are logged and dropped, so
/// a broken webhook can never block or fail a worker run.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    http: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        let payload = WebhookPayload { subject, body };
        match self
            .http
            .post(&self.url)
            .timeout(WEBHOOK_TIMEOUT)
            .json(&payload)
            .send()
            .await
        {
            Ok(res) if !res.status().is_success() => {
                warn!("webhook returned HTTP {}", res.status().as_u16());
            }
            Ok(_) => {}
            Err(err) => warn!("webhook delivery failed: {err}"),
        }
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
}
