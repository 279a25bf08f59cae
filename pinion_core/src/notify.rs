//! Best-effort outbound alerting.

use async_trait::async_trait;

/// Outbound alert channel for user-impacting conditions (migration
/// failures, stuck pins, daemon down).
///
/// Delivery is best-effort by construction: the method cannot fail, so a
/// broken channel can never block or fail a worker run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str);
}

/// Notifier that only writes to the log. Used when no outbound channel is
/// configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        tracing::warn!("alert: {subject}: {body}");
    }
}
