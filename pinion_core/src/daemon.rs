//! Control-plane seam for the local storage daemon.

use crate::ContentId;
use anyhow::Result;
use async_trait::async_trait;

/// Repository usage as reported by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepoStat {
    pub used_bytes: u64,
    pub capacity_bytes: u64,
}

/// Outcome of one garbage-collection sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RepoGcResult {
    pub removed_objects: u64,
}

/// Outcome of a pin removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRemoval {
    Removed,
    /// The daemon did not hold a pin for the identifier. Callers reclaiming
    /// storage treat this as success.
    NotPinned,
}

/// The local storage daemon's control API.
///
/// Every call is a single bounded-timeout request; retry policy belongs to
/// the calling worker, never to the adapter.
#[async_trait]
pub trait StorageNode: Send + Sync {
    /// Whether the daemon is reachable and answering control requests.
    async fn is_running(&self) -> Result<bool>;

    async fn pin_add(&self, id: &ContentId) -> Result<()>;

    async fn pin_remove(&self, id: &ContentId) -> Result<PinRemoval>;

    /// All identifiers currently pinned on the daemon.
    async fn list_pins(&self) -> Result<Vec<ContentId>>;

    /// Cumulative size of the object in bytes. Failures are non-fatal to
    /// callers, which fall back to an unknown size.
    async fn stat_object_size(&self, id: &ContentId) -> Result<u64>;

    async fn repo_stat(&self) -> Result<RepoStat>;

    async fn repo_gc(&self) -> Result<RepoGcResult>;
}
