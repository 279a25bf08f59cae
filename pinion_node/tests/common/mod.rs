//! Shared harness for worker tests: memory state store + scriptable fakes.

// Each test binary uses its own slice of the harness.
#![allow(dead_code)]

use pinion_core::testutil::{CollectingNotifier, FakeStorageNode, FakeSupernode, FakeValidator};
use pinion_core::{ContentId, Pin, PinRegistry, SECONDS_PER_DAY, unix_now};
use pinion_node::NodeDeps;
use pinion_node::config::{CleanupConfig, MigrationConfig};
use pinion_node::workers::{CleanupWorker, DiscoveryWorker, MigrationWorker, ValidationWorker};
use pinion_registry_memory::MemoryStateStore;
use std::sync::Arc;

pub struct Harness {
    pub store: Arc<MemoryStateStore>,
    pub daemon: Arc<FakeStorageNode>,
    pub supernode: Arc<FakeSupernode>,
    pub validator: Arc<FakeValidator>,
    pub notifier: Arc<CollectingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStateStore::new()),
            daemon: Arc::new(FakeStorageNode::new()),
            supernode: Arc::new(FakeSupernode::new()),
            validator: Arc::new(FakeValidator::new()),
            notifier: Arc::new(CollectingNotifier::new()),
        }
    }

    pub fn deps(&self) -> NodeDeps {
        NodeDeps {
            registry: self.store.clone(),
            events: self.store.clone(),
            stats: self.store.clone(),
            daemon: self.daemon.clone(),
            supernode: self.supernode.clone(),
            validator: self.validator.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub fn discovery_worker(&self) -> DiscoveryWorker {
        DiscoveryWorker::new(self.store.clone(), self.daemon.clone(), self.store.clone())
    }

    pub fn validation_worker(&self) -> ValidationWorker {
        ValidationWorker::new(self.store.clone(), self.validator.clone(), self.store.clone())
    }

    pub fn migration_worker(&self, config: MigrationConfig) -> MigrationWorker {
        MigrationWorker::new(
            self.store.clone(),
            self.supernode.clone(),
            self.store.clone(),
            self.store.clone(),
            self.notifier.clone(),
            config,
        )
    }

    pub fn cleanup_worker(&self, config: CleanupConfig) -> CleanupWorker {
        CleanupWorker::new(
            self.store.clone(),
            self.daemon.clone(),
            self.store.clone(),
            self.store.clone(),
            self.notifier.clone(),
            config,
        )
    }

    /// Inserts a registry row whose age is exactly `age_days` whole days.
    pub async fn insert_aged(&self, id: &ContentId, age_days: u64) -> Pin {
        let pin = Pin::discovered(id.clone(), Some(1024), unix_now() - age_days * SECONDS_PER_DAY);
        assert!(self.store.insert_if_absent(pin.clone()).await.unwrap());
        pin
    }

    /// Inserts a row one second short of `age_days` whole days old.
    pub async fn insert_just_under(&self, id: &ContentId, age_days: u64) -> Pin {
        let pin = Pin::discovered(
            id.clone(),
            Some(1024),
            unix_now() - age_days * SECONDS_PER_DAY + 1,
        );
        assert!(self.store.insert_if_absent(pin.clone()).await.unwrap());
        pin
    }

    /// Re-dates an existing row so its age becomes `age_days`, simulating
    /// the passage of time between worker runs.
    pub async fn backdate(&self, id: &ContentId, age_days: u64) {
        let mut pin = self.store.get(id).await.unwrap().unwrap();
        pin.discovered_at = unix_now() - age_days * SECONDS_PER_DAY;
        self.store.update(pin).await.unwrap();
    }
}

pub fn id(s: &str) -> ContentId {
    s.parse().unwrap()
}

/// Migration config without sleeps, for fast test runs.
pub fn fast_migration(start_after_days: u64, batch_size: usize) -> MigrationConfig {
    MigrationConfig {
        start_after_days,
        batch_size,
        throttle_ms: 0,
        propagation_delay_ms: 0,
        max_retries_alert: 10,
    }
}
