//! RedbStateStore - durable pinion state backed by redb.
//!
//! One database file holds all durable state the node owns: the pin
//! registry, the append-only event log, and the two daily-aggregate
//! tables. Values are minicbor-encoded.

use anyhow::anyhow;
use async_trait::async_trait;
use pinion_core::registry::compare_oldest_first;
use pinion_core::{
    CleanupDayStats, ContentId, Event, EventSink, MigrationDayStats, Pin, PinQuery, PinRegistry,
    StatsStore, unix_now,
};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::{path::Path, sync::Arc};

const PINS: TableDefinition<&str, &[u8]> = TableDefinition::new("pins");
const EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("events");
const MIGRATION_STATS: TableDefinition<&str, &[u8]> = TableDefinition::new("migration_stats");
const CLEANUP_STATS: TableDefinition<&str, &[u8]> = TableDefinition::new("cleanup_stats");

/// Durable state store for a pinion node.
#[derive(Clone)]
pub struct RedbStateStore {
    db: Arc<Database>,
}

impl RedbStateStore {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let db = Database::create(path.join("pinion.redb"))?;

        // Ensure all tables exist before returning, so the first access on
        // a fresh database can be a read.
        {
            let write_txn = db.begin_write()?;
            {
                let _ = write_txn.open_table(PINS)?;
                let _ = write_txn.open_table(EVENTS)?;
                let _ = write_txn.open_table(MIGRATION_STATS)?;
                let _ = write_txn.open_table(CLEANUP_STATS)?;
            }
            write_txn.commit()?;
        }

        Ok(Self { db: Arc::new(db) })
    }

    /// All recorded events in append order. Observational only; nothing in
    /// the orchestration path reads this.
    pub async fn events(&self) -> anyhow::Result<Vec<Event>> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Event>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(EVENTS)?;
            let mut events = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                events.push(decode_value::<Event>(value.value())?);
            }
            Ok(events)
        })
        .await
        .map_err(|e| anyhow!("redb read task failed: {}", e))?
    }

    pub async fn migration_stats(&self, date: &str) -> anyhow::Result<Option<MigrationDayStats>> {
        let db = self.db.clone();
        let date = date.to_owned();
        tokio::task::spawn_blocking(move || -> anyhow::Result<Option<MigrationDayStats>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(MIGRATION_STATS)?;
            table
                .get(date.as_str())?
                .map(|guard| decode_value(guard.value()))
                .transpose()
        })
        .await
        .map_err(|e| anyhow!("redb read task failed: {}", e))?
    }

    pub async fn cleanup_stats(&self, date: &str) -> anyhow::Result<Option<CleanupDayStats>> {
        let db = self.db.clone();
        let date = date.to_owned();
        tokio::task::spawn_blocking(move || -> anyhow::Result<Option<CleanupDayStats>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(CLEANUP_STATS)?;
            table
                .get(date.as_str())?
                .map(|guard| decode_value(guard.value()))
                .transpose()
        })
        .await
        .map_err(|e| anyhow!("redb read task failed: {}", e))?
    }
}

impl std::fmt::Debug for RedbStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStateStore").finish()
    }
}

fn decode_value<'b, T: minicbor::Decode<'b, ()>>(bytes: &'b [u8]) -> anyhow::Result<T> {
    minicbor::decode(bytes).map_err(|e| anyhow!("CBOR decode failed: {}", e))
}

#[async_trait]
impl PinRegistry for RedbStateStore {
    async fn insert_if_absent(&self, pin: Pin) -> anyhow::Result<bool> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let write_txn = db.begin_write()?;
            let inserted = {
                let mut table = write_txn.open_table(PINS)?;
                if table.get(pin.id.as_str())?.is_some() {
                    false
                } else {
                    let encoded = minicbor::to_vec(&pin)?;
                    table.insert(pin.id.as_str(), encoded.as_slice())?;
                    true
                }
            };
            write_txn.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(|e| anyhow!("redb write task failed: {}", e))?
    }

    async fn get(&self, id: &ContentId) -> anyhow::Result<Option<Pin>> {
        let db = self.db.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<Option<Pin>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(PINS)?;
            table
                .get(id.as_str())?
                .map(|guard| decode_value(guard.value()))
                .transpose()
        })
        .await
        .map_err(|e| anyhow!("redb read task failed: {}", e))?
    }

    async fn update(&self, pin: Pin) -> anyhow::Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(PINS)?;
                let encoded = minicbor::to_vec(&pin)?;
                table.insert(pin.id.as_str(), encoded.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| anyhow!("redb write task failed: {}", e))?
    }

    async fn delete(&self, id: &ContentId) -> anyhow::Result<bool> {
        let db = self.db.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let write_txn = db.begin_write()?;
            let removed = {
                let mut table = write_txn.open_table(PINS)?;
                table.remove(id.as_str())?.is_some()
            };
            write_txn.commit()?;
            Ok(removed)
        })
        .await
        .map_err(|e| anyhow!("redb write task failed: {}", e))?
    }

    async fn select(&self, query: &PinQuery) -> anyhow::Result<Vec<Pin>> {
        let db = self.db.clone();
        let query = query.clone();
        let now = unix_now();
        tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Pin>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(PINS)?;
            let mut matched = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                let pin: Pin = decode_value(value.value())?;
                if query.matches(&pin, now) {
                    matched.push(pin);
                }
            }
            matched.sort_by(compare_oldest_first);
            if let Some(limit) = query.limit {
                matched.truncate(limit);
            }
            Ok(matched)
        })
        .await
        .map_err(|e| anyhow!("redb read task failed: {}", e))?
    }

    async fn count(&self, query: &PinQuery) -> anyhow::Result<u64> {
        let db = self.db.clone();
        let query = query.clone();
        let now = unix_now();
        tokio::task::spawn_blocking(move || -> anyhow::Result<u64> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(PINS)?;
            let mut count = 0u64;
            for entry in table.iter()? {
                let (_, value) = entry?;
                let pin: Pin = decode_value(value.value())?;
                if query.matches(&pin, now) {
                    count += 1;
                }
            }
            Ok(count)
        })
        .await
        .map_err(|e| anyhow!("redb read task failed: {}", e))?
    }
}

#[async_trait]
impl EventSink for RedbStateStore {
    async fn append(&self, event: Event) -> anyhow::Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(EVENTS)?;
                let next_id = table
                    .last()?
                    .map(|(key, _)| key.value() + 1)
                    .unwrap_or_default();
                let encoded = minicbor::to_vec(&event)?;
                table.insert(next_id, encoded.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| anyhow!("redb write task failed: {}", e))?
    }
}

#[async_trait]
impl StatsStore for RedbStateStore {
    async fn add_migration_stats(&self, date: &str, delta: MigrationDayStats) -> anyhow::Result<()> {
        let db = self.db.clone();
        let date = date.to_owned();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(MIGRATION_STATS)?;
                let mut total: MigrationDayStats = table
                    .get(date.as_str())?
                    .map(|guard| decode_value(guard.value()))
                    .transpose()?
                    .unwrap_or_default();
                total.accumulate(&delta);
                let encoded = minicbor::to_vec(&total)?;
                table.insert(date.as_str(), encoded.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| anyhow!("redb write task failed: {}", e))?
    }

    async fn add_cleanup_stats(&self, date: &str, delta: CleanupDayStats) -> anyhow::Result<()> {
        let db = self.db.clone();
        let date = date.to_owned();
        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(CLEANUP_STATS)?;
                let mut total: CleanupDayStats = table
                    .get(date.as_str())?
                    .map(|guard| decode_value(guard.value()))
                    .transpose()?
                    .unwrap_or_default();
                total.accumulate(&delta);
                let encoded = minicbor::to_vec(&total)?;
                table.insert(date.as_str(), encoded.as_slice())?;
            }
            write_txn.commit()?;
            Ok(())
        })
        .await
        .map_err(|e| anyhow!("redb write task failed: {}", e))?
    }

    async fn prune_stats(&self, keep_from: &str) -> anyhow::Result<u64> {
        let db = self.db.clone();
        let keep_from = keep_from.to_owned();
        tokio::task::spawn_blocking(move || -> anyhow::Result<u64> {
            let write_txn = db.begin_write()?;
            let mut removed = 0u64;
            {
                for def in [MIGRATION_STATS, CLEANUP_STATS] {
                    let mut table = write_txn.open_table(def)?;
                    let stale: Vec<String> = table
                        .range(..keep_from.as_str())?
                        .map(|entry| entry.map(|(key, _)| key.value().to_owned()))
                        .collect::<Result<_, _>>()?;
                    for key in &stale {
                        table.remove(key.as_str())?;
                        removed += 1;
                    }
                }
            }
            write_txn.commit()?;
            Ok(removed)
        })
        .await
        .map_err(|e| anyhow!("redb write task failed: {}", e))?
    }
}
