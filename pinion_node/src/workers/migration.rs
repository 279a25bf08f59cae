//! Replicates accepted pins to the supernode and verifies they landed.

use super::record_error;
use crate::config::MigrationConfig;
use anyhow::{Result, bail};
use pinion_core::events::emit;
use pinion_core::{
    Event, EventSink, MigrationDayStats, Notifier, Pin, PinQuery, PinRegistry, PinStatus,
    ReplicationTarget, Severity, StatsStore, unix_now, utc_date,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct MigrationWorker {
    registry: Arc<dyn PinRegistry>,
    supernode: Arc<dyn ReplicationTarget>,
    events: Arc<dyn EventSink>,
    stats: Arc<dyn StatsStore>,
    notifier: Arc<dyn Notifier>,
    config: MigrationConfig,
}

#[derive(Debug, Default)]
pub struct MigrationReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Bytes actually transferred this run; fast-path confirmations count
    /// as zero.
    pub bytes_migrated: u64,
    /// Pins whose retry counter now exceeds the alert threshold. They stay
    /// eligible; this only feeds reporting.
    pub retries_exhausted: usize,
    pub errors: Vec<String>,
}

impl MigrationWorker {
    pub fn new(
        registry: Arc<dyn PinRegistry>,
        supernode: Arc<dyn ReplicationTarget>,
        events: Arc<dyn EventSink>,
        stats: Arc<dyn StatsStore>,
        notifier: Arc<dyn Notifier>,
        config: MigrationConfig,
    ) -> Self {
        Self {
            registry,
            supernode,
            events,
            stats,
            notifier,
            config,
        }
    }

    /// Selects the oldest accepted, unmigrated pins past the age gate and
    /// replicates them one by one. One pin's failure never aborts the
    /// batch; failures are aggregated into a single notification.
    pub async fn run(&self) -> Result<MigrationReport> {
        let eligible = self
            .registry
            .select(
                &PinQuery::default()
                    .with_status(PinStatus::Accepted)
                    .with_migrated(false)
                    .with_min_age_days(self.config.start_after_days)
                    .with_limit(self.config.batch_size),
            )
            .await?;

        let mut report = MigrationReport::default();
        for (i, pin) in eligible.into_iter().enumerate() {
            if i > 0 && self.config.throttle_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.throttle_ms)).await;
            }
            report.processed += 1;
            match self.migrate_pin(&pin).await {
                Ok(bytes) => {
                    report.succeeded += 1;
                    report.bytes_migrated += bytes;
                }
                Err(err) => {
                    report.failed += 1;
                    warn!("migration failed for {}: {err}", pin.id);
                    record_error(&mut report.errors, format!("{}: {err}", pin.id));

                    let mut pin = pin;
                    pin.record_retry_failure(unix_now(), format!("migration failed: {err}"));
                    if pin.retry_count > self.config.max_retries_alert {
                        report.retries_exhausted += 1;
                    }
                    let id = pin.id.clone();
                    if let Err(write_err) = self.registry.update(pin).await {
                        warn!("retry bookkeeping failed for {id}: {write_err}");
                    }
                }
            }
        }

        self.finish_run(&report).await;
        Ok(report)
    }

    /// Replicates a single pin and marks it migrated, returning the bytes
    /// transferred. Also the entry point for the manual force-migrate
    /// path, which deliberately skips the age and status gates (and, like
    /// its predecessors, does not check `status` at all).
    pub async fn migrate_pin(&self, pin: &Pin) -> Result<u64> {
        let id = &pin.id;

        // Fast path: already present on the target, no redundant transfer.
        if self.supernode.verify(id).await? {
            let mut updated = pin.clone();
            updated.mark_migrated(unix_now(), "already present on supernode");
            self.registry.update(updated).await?;
            debug!("{id} was already present on the supernode");
            return Ok(0);
        }

        self.supernode.pin(id, pin.size_bytes).await?;

        if self.config.propagation_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.propagation_delay_ms)).await;
        }

        // The target accepted the call; presence must still be confirmed.
        if !self.supernode.verify(id).await? {
            bail!("pin call was accepted but {id} did not appear on the supernode");
        }

        let mut updated = pin.clone();
        updated.mark_migrated(unix_now(), "replicated to supernode");
        self.registry.update(updated).await?;
        Ok(pin.size_bytes.unwrap_or(0))
    }

    async fn finish_run(&self, report: &MigrationReport) {
        let now = unix_now();
        let delta = MigrationDayStats {
            runs: 1,
            processed: report.processed as u64,
            succeeded: report.succeeded as u64,
            failed: report.failed as u64,
            bytes_migrated: report.bytes_migrated,
        };
        if let Err(err) = self.stats.add_migration_stats(&utc_date(now), delta).await {
            warn!("migration stats write failed: {err}");
        }

        let severity = if report.failed > 0 {
            Severity::Warning
        } else {
            Severity::Info
        };
        emit(
            self.events.as_ref(),
            Event::new("migration.run", severity, "migration run finished", now)
                .with("processed", report.processed)
                .with("succeeded", report.succeeded)
                .with("failed", report.failed)
                .with("bytes_migrated", report.bytes_migrated)
                .with("retries_exhausted", report.retries_exhausted),
        )
        .await;

        if report.failed > 0 {
            self.notifier
                .notify(
                    "migration failures",
                    &format!(
                        "{} of {} pins failed to migrate: {}",
                        report.failed,
                        report.processed,
                        report.errors.join("; ")
                    ),
                )
                .await;
        }
    }
}
