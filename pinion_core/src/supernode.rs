//! Control-plane seam for the durable replication target.

use crate::ContentId;
use anyhow::Result;
use async_trait::async_trait;

/// The remote node content is migrated to.
#[async_trait]
pub trait ReplicationTarget: Send + Sync {
    /// Asks the target to fetch and pin the identifier. The size hint
    /// scales the request timeout; an unknown size gets the base timeout.
    async fn pin(&self, id: &ContentId, size_hint_bytes: Option<u64>) -> Result<()>;

    /// Whether the identifier is currently pinned on the target.
    ///
    /// Implementations resolve every ambiguous response shape to a boolean:
    /// any inability to positively confirm presence counts as "not pinned".
    /// A false negative merely re-attempts an idempotent migration; a false
    /// positive would skip replication of unreplicated content.
    async fn verify(&self, id: &ContentId) -> Result<bool>;
}
