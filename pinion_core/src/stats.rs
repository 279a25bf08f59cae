//! Daily aggregate rollups of worker run results.
//!
//! Aggregates are write-only accumulators keyed by UTC calendar date; the
//! only lifecycle they have is periodic retention pruning.

use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use minicbor::{Decode, Encode};
use serde::Serialize;

/// UTC calendar date (`YYYY-MM-DD`) for a unix-seconds timestamp. Used as
/// the aggregate table key; the ISO form sorts chronologically as text.
pub fn utc_date(unix_secs: u64) -> String {
    DateTime::from_timestamp(unix_secs as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "0000-00-00".to_owned())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode, Serialize)]
pub struct MigrationDayStats {
    #[n(0)]
    pub runs: u64,
    #[n(1)]
    pub processed: u64,
    #[n(2)]
    pub succeeded: u64,
    #[n(3)]
    pub failed: u64,
    #[n(4)]
    pub bytes_migrated: u64,
}

impl MigrationDayStats {
    pub fn accumulate(&mut self, delta: &MigrationDayStats) {
        self.runs += delta.runs;
        self.processed += delta.processed;
        self.succeeded += delta.succeeded;
        self.failed += delta.failed;
        self.bytes_migrated += delta.bytes_migrated;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Encode, Decode, Serialize)]
pub struct CleanupDayStats {
    #[n(0)]
    pub runs: u64,
    #[n(1)]
    pub unpinned: u64,
    #[n(2)]
    pub rejected_purged: u64,
    #[n(3)]
    pub bytes_freed: u64,
    #[n(4)]
    pub gc_runs: u64,
    #[n(5)]
    pub gc_bytes_freed: u64,
}

impl CleanupDayStats {
    pub fn accumulate(&mut self, delta: &CleanupDayStats) {
        self.runs += delta.runs;
        self.unpinned += delta.unpinned;
        self.rejected_purged += delta.rejected_purged;
        self.bytes_freed += delta.bytes_freed;
        self.gc_runs += delta.gc_runs;
        self.gc_bytes_freed += delta.gc_bytes_freed;
    }
}

/// Upsert-by-date accumulation of worker run results.
#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn add_migration_stats(&self, date: &str, delta: MigrationDayStats) -> Result<()>;

    async fn add_cleanup_stats(&self, date: &str, delta: CleanupDayStats) -> Result<()>;

    /// Drops aggregate rows for dates before `keep_from` (inclusive cutoff).
    /// Returns the number of rows removed.
    async fn prune_stats(&self, keep_from: &str) -> Result<u64>;
}
