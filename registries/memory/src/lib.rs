//! In-memory state store implementing the full registry surface
//! (`PinRegistry`, `EventSink`, `StatsStore`).
//!
//! The in-memory twin of `pinion_registry_redb`: used by worker tests and
//! by ephemeral nodes that do not need durability. Extra accessors expose
//! recorded events and aggregates for assertions.

use anyhow::Result;
use async_trait::async_trait;
use pinion_core::registry::compare_oldest_first;
use pinion_core::{
    CleanupDayStats, ContentId, Event, EventSink, MigrationDayStats, Pin, PinQuery, PinRegistry,
    StatsStore, unix_now,
};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    pins: Mutex<BTreeMap<String, Pin>>,
    events: Mutex<Vec<Event>>,
    migration_stats: Mutex<BTreeMap<String, MigrationDayStats>>,
    cleanup_stats: Mutex<BTreeMap<String, CleanupDayStats>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in append order.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn migration_stats(&self, date: &str) -> Option<MigrationDayStats> {
        self.migration_stats.lock().unwrap().get(date).copied()
    }

    pub fn cleanup_stats(&self, date: &str) -> Option<CleanupDayStats> {
        self.cleanup_stats.lock().unwrap().get(date).copied()
    }

    pub fn pin_count(&self) -> usize {
        self.pins.lock().unwrap().len()
    }
}

#[async_trait]
impl PinRegistry for MemoryStateStore {
    async fn insert_if_absent(&self, pin: Pin) -> Result<bool> {
        let mut pins = self.pins.lock().unwrap();
        if pins.contains_key(pin.id.as_str()) {
            return Ok(false);
        }
        pins.insert(pin.id.as_str().to_owned(), pin);
        Ok(true)
    }

    async fn get(&self, id: &ContentId) -> Result<Option<Pin>> {
        Ok(self.pins.lock().unwrap().get(id.as_str()).cloned())
    }

    async fn update(&self, pin: Pin) -> Result<()> {
        self.pins
            .lock()
            .unwrap()
            .insert(pin.id.as_str().to_owned(), pin);
        Ok(())
    }

    async fn delete(&self, id: &ContentId) -> Result<bool> {
        Ok(self.pins.lock().unwrap().remove(id.as_str()).is_some())
    }

    async fn select(&self, query: &PinQuery) -> Result<Vec<Pin>> {
        let now = unix_now();
        let mut matched: Vec<Pin> = self
            .pins
            .lock()
            .unwrap()
            .values()
            .filter(|pin| query.matches(pin, now))
            .cloned()
            .collect();
        matched.sort_by(compare_oldest_first);
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn count(&self, query: &PinQuery) -> Result<u64> {
        let now = unix_now();
        let count = self
            .pins
            .lock()
            .unwrap()
            .values()
            .filter(|pin| query.matches(pin, now))
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl EventSink for MemoryStateStore {
    async fn append(&self, event: Event) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[async_trait]
impl StatsStore for MemoryStateStore {
    async fn add_migration_stats(&self, date: &str, delta: MigrationDayStats) -> Result<()> {
        self.migration_stats
            .lock()
            .unwrap()
            .entry(date.to_owned())
            .or_default()
            .accumulate(&delta);
        Ok(())
    }

    async fn add_cleanup_stats(&self, date: &str, delta: CleanupDayStats) -> Result<()> {
        self.cleanup_stats
            .lock()
            .unwrap()
            .entry(date.to_owned())
            .or_default()
            .accumulate(&delta);
        Ok(())
    }

    async fn prune_stats(&self, keep_from: &str) -> Result<u64> {
        fn drop_stale<V>(stats: &mut BTreeMap<String, V>, keep_from: &str) -> u64 {
            let stale: Vec<String> = stats
                .range(..keep_from.to_owned())
                .map(|(k, _)| k.clone())
                .collect();
            for key in &stale {
                stats.remove(key);
            }
            stale.len() as u64
        }

        let mut removed = drop_stale(&mut self.migration_stats.lock().unwrap(), keep_from);
        removed += drop_stale(&mut self.cleanup_stats.lock().unwrap(), keep_from);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinion_core::{PinStatus, SECONDS_PER_DAY};

    fn pin(id: &str, age_days: u64) -> Pin {
        Pin::discovered(
            id.parse().unwrap(),
            Some(100),
            unix_now() - age_days * SECONDS_PER_DAY,
        )
    }

    #[tokio::test]
    async fn insert_is_idempotent() {
        let store = MemoryStateStore::new();
        assert!(store.insert_if_absent(pin("Qm123", 0)).await.unwrap());
        assert!(!store.insert_if_absent(pin("Qm123", 5)).await.unwrap());
        assert_eq!(store.pin_count(), 1);
    }

    #[tokio::test]
    async fn select_orders_oldest_first_and_limits() {
        let store = MemoryStateStore::new();
        for (id, age) in [("Qmbb", 2), ("Qmaa", 5), ("Qmcc", 9)] {
            store.insert_if_absent(pin(id, age)).await.unwrap();
        }

        let query = PinQuery::default()
            .with_status(PinStatus::Pending)
            .with_limit(2);
        let selected = store.select(&query).await.unwrap();
        let ids: Vec<&str> = selected.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["Qmcc", "Qmaa"]);
    }

    #[tokio::test]
    async fn prune_drops_rows_before_cutoff() {
        let store = MemoryStateStore::new();
        for date in ["2026-07-01", "2026-07-15", "2026-08-01"] {
            store
                .add_migration_stats(date, MigrationDayStats { runs: 1, ..Default::default() })
                .await
                .unwrap();
        }
        let removed = store.prune_stats("2026-07-15").await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.migration_stats("2026-07-01").is_none());
        assert!(store.migration_stats("2026-07-15").is_some());
    }
}
