//! In-memory fakes for worker and adapter tests.
//!
//! Only compiled with the `testutil` feature. The fakes record calls and
//! let tests inject per-identifier failures so batch-isolation behavior
//! can be exercised without a network.

use crate::daemon::{PinRemoval, RepoGcResult, RepoStat, StorageNode};
use crate::{ContentId, Notifier, ReplicationTarget, Validator};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Scriptable stand-in for the storage daemon control plane.
#[derive(Debug, Default)]
pub struct FakeStorageNode {
    pins: Mutex<BTreeSet<ContentId>>,
    sizes: Mutex<BTreeMap<ContentId, u64>>,
    stat_failures: Mutex<BTreeSet<ContentId>>,
    remove_failures: Mutex<BTreeSet<ContentId>>,
    repo_stats: Mutex<VecDeque<RepoStat>>,
    stopped: AtomicBool,
    gc_runs: AtomicU64,
    removed: Mutex<Vec<ContentId>>,
}

impl FakeStorageNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pin(&self, id: &ContentId, size: u64) {
        self.pins.lock().unwrap().insert(id.clone());
        self.sizes.lock().unwrap().insert(id.clone(), size);
    }

    /// Makes `stat_object_size` fail for this identifier.
    pub fn fail_stat(&self, id: &ContentId) {
        self.stat_failures.lock().unwrap().insert(id.clone());
    }

    /// Makes `pin_remove` fail for this identifier.
    pub fn fail_remove(&self, id: &ContentId) {
        self.remove_failures.lock().unwrap().insert(id.clone());
    }

    /// Queues the next `repo_stat` responses, in order.
    pub fn push_repo_stats(&self, stats: impl IntoIterator<Item = RepoStat>) {
        self.repo_stats.lock().unwrap().extend(stats);
    }

    pub fn set_stopped(&self, stopped: bool) {
        self.stopped.store(stopped, Ordering::SeqCst);
    }

    pub fn holds_pin(&self, id: &ContentId) -> bool {
        self.pins.lock().unwrap().contains(id)
    }

    pub fn removed(&self) -> Vec<ContentId> {
        self.removed.lock().unwrap().clone()
    }

    pub fn gc_runs(&self) -> u64 {
        self.gc_runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageNode for FakeStorageNode {
    async fn is_running(&self) -> Result<bool> {
        Ok(!self.stopped.load(Ordering::SeqCst))
    }

    async fn pin_add(&self, id: &ContentId) -> Result<()> {
        self.pins.lock().unwrap().insert(id.clone());
        Ok(())
    }

    async fn pin_remove(&self, id: &ContentId) -> Result<PinRemoval> {
        if self.remove_failures.lock().unwrap().contains(id) {
            bail!("daemon refused to unpin {id}");
        }
        if self.pins.lock().unwrap().remove(id) {
            self.removed.lock().unwrap().push(id.clone());
            Ok(PinRemoval::Removed)
        } else {
            Ok(PinRemoval::NotPinned)
        }
    }

    async fn list_pins(&self) -> Result<Vec<ContentId>> {
        Ok(self.pins.lock().unwrap().iter().cloned().collect())
    }

    async fn stat_object_size(&self, id: &ContentId) -> Result<u64> {
        if self.stat_failures.lock().unwrap().contains(id) {
            bail!("object stat failed for {id}");
        }
        match self.sizes.lock().unwrap().get(id) {
            Some(size) => Ok(*size),
            None => bail!("unknown object {id}"),
        }
    }

    async fn repo_stat(&self) -> Result<RepoStat> {
        Ok(self
            .repo_stats
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn repo_gc(&self) -> Result<RepoGcResult> {
        self.gc_runs.fetch_add(1, Ordering::SeqCst);
        Ok(RepoGcResult { removed_objects: 0 })
    }
}

/// Scriptable stand-in for the replication target.
#[derive(Debug, Default)]
pub struct FakeSupernode {
    pinned: Mutex<BTreeSet<ContentId>>,
    pin_failures: Mutex<BTreeSet<ContentId>>,
    stalled: Mutex<BTreeSet<ContentId>>,
    pin_calls: Mutex<Vec<ContentId>>,
}

impl FakeSupernode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the identifier as already pinned on the target.
    pub fn preload(&self, id: &ContentId) {
        self.pinned.lock().unwrap().insert(id.clone());
    }

    /// Makes `pin` fail for this identifier.
    pub fn fail_pin(&self, id: &ContentId) {
        self.pin_failures.lock().unwrap().insert(id.clone());
    }

    /// Makes `pin` succeed without the content ever becoming verifiable,
    /// modeling a target that accepts the call but does not converge.
    pub fn stall(&self, id: &ContentId) {
        self.stalled.lock().unwrap().insert(id.clone());
    }

    pub fn is_pinned(&self, id: &ContentId) -> bool {
        self.pinned.lock().unwrap().contains(id)
    }

    pub fn pin_calls(&self) -> Vec<ContentId> {
        self.pin_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplicationTarget for FakeSupernode {
    async fn pin(&self, id: &ContentId, _size_hint_bytes: Option<u64>) -> Result<()> {
        self.pin_calls.lock().unwrap().push(id.clone());
        if self.pin_failures.lock().unwrap().contains(id) {
            bail!("supernode pin failed for {id}");
        }
        if !self.stalled.lock().unwrap().contains(id) {
            self.pinned.lock().unwrap().insert(id.clone());
        }
        Ok(())
    }

    async fn verify(&self, id: &ContentId) -> Result<bool> {
        Ok(self.pinned.lock().unwrap().contains(id))
    }
}

/// Validator with a fixed set of valid identifiers.
#[derive(Debug, Default)]
pub struct FakeValidator {
    valid: Mutex<BTreeSet<ContentId>>,
    truncate_response: AtomicBool,
}

impl FakeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, id: &ContentId) {
        self.valid.lock().unwrap().insert(id.clone());
    }

    /// Makes the next responses one verdict short, violating the batch
    /// contract.
    pub fn truncate_response(&self) {
        self.truncate_response.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Validator for FakeValidator {
    async fn validate_batch(&self, ids: &[ContentId]) -> Result<Vec<bool>> {
        let valid = self.valid.lock().unwrap();
        let mut verdicts: Vec<bool> = ids.iter().map(|id| valid.contains(id)).collect();
        if self.truncate_response.load(Ordering::SeqCst) {
            verdicts.pop();
        }
        Ok(verdicts)
    }
}

/// Notifier that records every alert for assertions.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for CollectingNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_owned(), body.to_owned()));
    }
}
