//! The pin registry seam.
//!
//! The registry is the only shared mutable resource between the four
//! workers. Every call is a discrete read or write; no transaction spans
//! workers, and a worker's read-then-write sequence on a single pin is not
//! atomic against concurrent mutation. Correctness relies on idempotent
//! external operations plus forward-only lifecycle transitions.

use crate::{ContentId, Pin, PinStatus};
use anyhow::Result;
use async_trait::async_trait;

/// Selection parameters for registry queries.
///
/// Results are always ordered oldest-first (`discovered_at`, then
/// identifier) so batch limits stay FIFO-fair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinQuery {
    pub status: Option<PinStatus>,
    pub migrated: Option<bool>,
    pub unpinned: Option<bool>,
    pub min_age_days: Option<u64>,
    pub limit: Option<usize>,
}

impl PinQuery {
    pub fn with_status(mut self, status: PinStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_migrated(mut self, migrated: bool) -> Self {
        self.migrated = Some(migrated);
        self
    }

    pub fn with_unpinned(mut self, unpinned: bool) -> Self {
        self.unpinned = Some(unpinned);
        self
    }

    pub fn with_min_age_days(mut self, days: u64) -> Self {
        self.min_age_days = Some(days);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `pin` satisfies every filter of this query, with ages
    /// evaluated against `now`. The `limit` field does not participate.
    pub fn matches(&self, pin: &Pin, now: u64) -> bool {
        if let Some(status) = self.status
            && pin.status != status
        {
            return false;
        }
        if let Some(migrated) = self.migrated
            && pin.migrated != migrated
        {
            return false;
        }
        if let Some(unpinned) = self.unpinned
            && pin.unpinned != unpinned
        {
            return false;
        }
        if let Some(min_age) = self.min_age_days
            && pin.age_days(now) < min_age
        {
            return false;
        }
        true
    }
}

/// Durable store of pin lifecycle rows.
#[async_trait]
pub trait PinRegistry: Send + Sync {
    /// Inserts the pin unless a row with the same identifier already
    /// exists. Returns `true` if the row was inserted, `false` for the
    /// duplicate no-op.
    async fn insert_if_absent(&self, pin: Pin) -> Result<bool>;

    async fn get(&self, id: &ContentId) -> Result<Option<Pin>>;

    /// Writes the full row, replacing the stored state for its identifier.
    async fn update(&self, pin: Pin) -> Result<()>;

    /// Removes the row entirely. Returns `true` if a row was removed.
    async fn delete(&self, id: &ContentId) -> Result<bool>;

    /// All pins matching `query`, ordered oldest-first, capped at
    /// `query.limit` if set.
    async fn select(&self, query: &PinQuery) -> Result<Vec<Pin>>;

    /// Number of pins matching `query`, ignoring `query.limit`.
    async fn count(&self, query: &PinQuery) -> Result<u64>;
}

/// Oldest-first ordering used by every registry implementation.
pub fn compare_oldest_first(a: &Pin, b: &Pin) -> std::cmp::Ordering {
    a.discovered_at
        .cmp(&b.discovered_at)
        .then_with(|| a.id.cmp(&b.id))
}
