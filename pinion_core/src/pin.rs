//! The pin lifecycle row.
//!
//! A `Pin` tracks one content identifier from the moment it is observed on
//! the local storage daemon until its local copy is reclaimed. Lifecycle
//! flags only ever move forward: `status` goes `Pending` to `Accepted` or
//! `Rejected` exactly once, `migrated` and `unpinned` go `false` to `true`
//! and are never reset by any worker.

use crate::ContentId;
use minicbor::{Decode, Encode};
use serde::{Deserialize, Serialize};

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Validation outcome for a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Accepted,
    #[n(2)]
    Rejected,
}

/// One tracked content identifier and its replication/retention state.
///
/// Field indices are part of the persisted format.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Pin {
    #[n(0)]
    pub id: ContentId,
    /// Unix seconds at which the pin entered the registry.
    #[n(1)]
    pub discovered_at: u64,
    /// Filled in lazily from the daemon; may stay unknown.
    #[n(2)]
    pub size_bytes: Option<u64>,
    #[n(3)]
    pub status: PinStatus,
    #[n(4)]
    pub migrated: bool,
    #[n(5)]
    pub migrated_at: Option<u64>,
    #[n(6)]
    pub unpinned: bool,
    #[n(7)]
    pub unpinned_at: Option<u64>,
    /// Failed migration attempts. Monotonic; crossing the configured
    /// threshold is an alerting signal, not an eligibility gate.
    #[n(8)]
    pub retry_count: u32,
    #[n(9)]
    pub last_retry_at: Option<u64>,
    /// Audit trail of the last state-changing action.
    #[n(10)]
    pub note: Option<String>,
}

impl Pin {
    /// A freshly observed pin: pending, unmigrated, still held locally.
    pub fn discovered(id: ContentId, size_bytes: Option<u64>, now: u64) -> Self {
        Self {
            id,
            discovered_at: now,
            size_bytes,
            status: PinStatus::Pending,
            migrated: false,
            migrated_at: None,
            unpinned: false,
            unpinned_at: None,
            retry_count: 0,
            last_retry_at: None,
            note: None,
        }
    }

    /// Whole days elapsed since discovery, computed from wall clock at call
    /// time. Callers must tolerate eligibility changing between a query and
    /// its use during long runs.
    pub fn age_days(&self, now: u64) -> u64 {
        now.saturating_sub(self.discovered_at) / SECONDS_PER_DAY
    }

    pub fn mark_accepted(&mut self, note: impl Into<String>) {
        self.status = PinStatus::Accepted;
        self.note = Some(note.into());
    }

    pub fn mark_rejected(&mut self, note: impl Into<String>) {
        self.status = PinStatus::Rejected;
        self.note = Some(note.into());
    }

    pub fn mark_migrated(&mut self, now: u64, note: impl Into<String>) {
        self.migrated = true;
        self.migrated_at = Some(now);
        self.note = Some(note.into());
    }

    pub fn mark_unpinned(&mut self, now: u64, note: impl Into<String>) {
        self.unpinned = true;
        self.unpinned_at = Some(now);
        self.note = Some(note.into());
    }

    pub fn record_retry_failure(&mut self, now: u64, note: impl Into<String>) {
        self.retry_count += 1;
        self.last_retry_at = Some(now);
        self.note = Some(note.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin_aged(days: u64, now: u64) -> Pin {
        Pin::discovered(
            "Qm123".parse().unwrap(),
            Some(1024),
            now - days * SECONDS_PER_DAY,
        )
    }

    #[test]
    fn age_is_whole_days() {
        let now = 10_000_000;
        assert_eq!(pin_aged(0, now).age_days(now), 0);
        assert_eq!(pin_aged(3, now).age_days(now), 3);

        // One second short of four days still counts as three.
        let mut pin = pin_aged(4, now);
        pin.discovered_at += 1;
        assert_eq!(pin.age_days(now), 3);
    }

    #[test]
    fn age_tolerates_clock_skew() {
        let now = 1_000;
        let pin = Pin::discovered("Qm123".parse().unwrap(), None, now + 500);
        assert_eq!(pin.age_days(now), 0);
    }

    #[test]
    fn retry_bookkeeping_is_monotonic() {
        let mut pin = pin_aged(1, 10_000_000);
        pin.record_retry_failure(10_000_001, "pin call timed out");
        pin.record_retry_failure(10_000_002, "pin call timed out");
        assert_eq!(pin.retry_count, 2);
        assert_eq!(pin.last_retry_at, Some(10_000_002));
    }
}
