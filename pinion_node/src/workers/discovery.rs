//! Reconciles the daemon's actual pin set into the registry.

use super::record_error;
use anyhow::{Result, bail};
use pinion_core::events::emit;
use pinion_core::{
    ContentId, Event, EventSink, Pin, PinRegistry, Severity, StorageNode, unix_now,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct DiscoveryWorker {
    registry: Arc<dyn PinRegistry>,
    daemon: Arc<dyn StorageNode>,
    events: Arc<dyn EventSink>,
}

#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Identifiers seen on the daemon.
    pub scanned: usize,
    /// New registry rows created this run.
    pub added: usize,
    /// Identifiers that were already tracked.
    pub known: usize,
    /// Identifiers whose processing failed entirely.
    pub failed: usize,
    /// First few per-identifier errors, including non-fatal size lookups.
    pub errors: Vec<String>,
}

enum Outcome {
    Added,
    Known,
}

impl DiscoveryWorker {
    pub fn new(
        registry: Arc<dyn PinRegistry>,
        daemon: Arc<dyn StorageNode>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            daemon,
            events,
        }
    }

    /// Lists everything pinned on the daemon and inserts unknown
    /// identifiers as pending. Idempotent: an unchanged pin set adds zero
    /// rows. Identifiers are processed independently; one failure never
    /// aborts the batch.
    pub async fn run(&self) -> Result<DiscoveryReport> {
        if !self.daemon.is_running().await? {
            bail!("storage daemon is not reachable");
        }

        let ids = self.daemon.list_pins().await?;
        let now = unix_now();
        let mut report = DiscoveryReport::default();

        for id in ids {
            report.scanned += 1;
            match self.observe(&id, now, &mut report.errors).await {
                Ok(Outcome::Added) => report.added += 1,
                Ok(Outcome::Known) => report.known += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!("discovery failed for {id}: {err}");
                    record_error(&mut report.errors, format!("{id}: {err}"));
                }
            }
        }

        debug!(
            scanned = report.scanned,
            added = report.added,
            known = report.known,
            "discovery run finished"
        );
        emit(
            self.events.as_ref(),
            Event::new("discovery.run", Severity::Info, "discovery run finished", now)
                .with("scanned", report.scanned)
                .with("added", report.added)
                .with("known", report.known)
                .with("failed", report.failed),
        )
        .await;
        Ok(report)
    }

    async fn observe(
        &self,
        id: &ContentId,
        now: u64,
        errors: &mut Vec<String>,
    ) -> Result<Outcome> {
        if self.registry.get(id).await?.is_some() {
            return Ok(Outcome::Known);
        }

        // Best-effort: a failed size lookup still inserts the pin, with the
        // size left unknown.
        let size_bytes = match self.daemon.stat_object_size(id).await {
            Ok(size) => Some(size),
            Err(err) => {
                record_error(errors, format!("{id}: size lookup: {err}"));
                None
            }
        };

        if self
            .registry
            .insert_if_absent(Pin::discovered(id.clone(), size_bytes, now))
            .await?
        {
            Ok(Outcome::Added)
        } else {
            Ok(Outcome::Known)
        }
    }
}
