//! Reclaims local storage once pins no longer need to be held.

use super::record_error;
use crate::config::CleanupConfig;
use anyhow::Result;
use pinion_core::events::emit;
use pinion_core::{
    CleanupDayStats, Event, EventSink, Notifier, PinQuery, PinRegistry, PinStatus, Severity,
    StatsStore, StorageNode, unix_now, utc_date,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct CleanupWorker {
    registry: Arc<dyn PinRegistry>,
    daemon: Arc<dyn StorageNode>,
    events: Arc<dyn EventSink>,
    stats: Arc<dyn StatsStore>,
    notifier: Arc<dyn Notifier>,
    config: CleanupConfig,
}

#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Migrated pins whose local copy was released this run.
    pub unpinned: usize,
    /// Sum of the released pins' recorded sizes.
    pub bytes_freed: u64,
    /// Rejected pins removed and purged from the registry.
    pub rejected_purged: usize,
    pub gc_removed_objects: u64,
    pub gc_bytes_freed: u64,
    pub gc_duration_ms: u64,
    pub gc_error: Option<String>,
    /// Accepted, unmigrated pins past the staleness threshold. Alerting
    /// only; never alters eligibility.
    pub overdue: u64,
    pub errors: Vec<String>,
}

impl CleanupWorker {
    pub fn new(
        registry: Arc<dyn PinRegistry>,
        daemon: Arc<dyn StorageNode>,
        events: Arc<dyn EventSink>,
        stats: Arc<dyn StatsStore>,
        notifier: Arc<dyn Notifier>,
        config: CleanupConfig,
    ) -> Self {
        Self {
            registry,
            daemon,
            events,
            stats,
            notifier,
            config,
        }
    }

    /// Runs the two reclaim passes and a garbage-collection sweep, in that
    /// fixed order. GC runs even when both passes found nothing.
    pub async fn run(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        self.reclaim_migrated(&mut report).await?;
        self.purge_rejected(&mut report).await?;
        self.collect_garbage(&mut report).await;

        report.overdue = self
            .registry
            .count(
                &PinQuery::default()
                    .with_status(PinStatus::Accepted)
                    .with_migrated(false)
                    .with_min_age_days(self.config.overdue_after_days),
            )
            .await?;
        if report.overdue > 0 {
            self.notifier
                .notify(
                    "overdue pins",
                    &format!(
                        "{} accepted pins older than {} days are still unmigrated",
                        report.overdue, self.config.overdue_after_days
                    ),
                )
                .await;
        }

        self.finish_run(&report).await;
        Ok(report)
    }

    /// Releases local copies of migrated pins past the retention age. The
    /// registry row is kept for audit, flagged `unpinned`.
    async fn reclaim_migrated(&self, report: &mut CleanupReport) -> Result<()> {
        let reclaimable = self
            .registry
            .select(
                &PinQuery::default()
                    .with_migrated(true)
                    .with_unpinned(false)
                    .with_min_age_days(self.config.delete_after_days),
            )
            .await?;

        for mut pin in reclaimable {
            // Removal failures keep `unpinned` false, so the pin is simply
            // retried next run.
            match self.daemon.pin_remove(&pin.id).await {
                Ok(_) => {
                    let size = pin.size_bytes.unwrap_or(0);
                    let id = pin.id.clone();
                    pin.mark_unpinned(unix_now(), "local copy released after replication");
                    match self.registry.update(pin).await {
                        Ok(()) => {
                            report.unpinned += 1;
                            report.bytes_freed += size;
                        }
                        Err(err) => {
                            warn!("unpin bookkeeping failed for {id}: {err}");
                            record_error(&mut report.errors, format!("{id}: {err}"));
                        }
                    }
                }
                Err(err) => {
                    warn!("unpin failed for {}: {err}", pin.id);
                    record_error(&mut report.errors, format!("{}: {err}", pin.id));
                }
            }
        }
        Ok(())
    }

    /// Removes rejected pins past their retention and deletes their rows
    /// entirely; rejected content keeps no audit trail.
    async fn purge_rejected(&self, report: &mut CleanupReport) -> Result<()> {
        let expired = self
            .registry
            .select(
                &PinQuery::default()
                    .with_status(PinStatus::Rejected)
                    .with_min_age_days(self.config.invalid_retention_days),
            )
            .await?;

        for pin in expired {
            // "Not pinned" counts as success: the content may never have
            // been locally confirmed in the first place.
            match self.daemon.pin_remove(&pin.id).await {
                Ok(_) => match self.registry.delete(&pin.id).await {
                    Ok(_) => report.rejected_purged += 1,
                    Err(err) => {
                        warn!("purge failed for {}: {err}", pin.id);
                        record_error(&mut report.errors, format!("{}: {err}", pin.id));
                    }
                },
                Err(err) => {
                    warn!("unpin of rejected {} failed: {err}", pin.id);
                    record_error(&mut report.errors, format!("{}: {err}", pin.id));
                }
            }
        }
        Ok(())
    }

    /// Unconditional GC sweep with used-space measured before and after.
    async fn collect_garbage(&self, report: &mut CleanupReport) {
        let before = self.daemon.repo_stat().await.ok();
        let started = Instant::now();
        match self.daemon.repo_gc().await {
            Ok(result) => report.gc_removed_objects = result.removed_objects,
            Err(err) => {
                warn!("repo gc failed: {err}");
                report.gc_error = Some(err.to_string());
            }
        }
        report.gc_duration_ms = started.elapsed().as_millis() as u64;
        let after = self.daemon.repo_stat().await.ok();

        if let (Some(before), Some(after)) = (before, after) {
            report.gc_bytes_freed = before.used_bytes.saturating_sub(after.used_bytes);
        }
    }

    async fn finish_run(&self, report: &CleanupReport) {
        let now = unix_now();
        let delta = CleanupDayStats {
            runs: 1,
            unpinned: report.unpinned as u64,
            rejected_purged: report.rejected_purged as u64,
            bytes_freed: report.bytes_freed,
            gc_runs: if report.gc_error.is_none() { 1 } else { 0 },
            gc_bytes_freed: report.gc_bytes_freed,
        };
        if let Err(err) = self.stats.add_cleanup_stats(&utc_date(now), delta).await {
            warn!("cleanup stats write failed: {err}");
        }

        if self.config.stats_retention_days > 0 {
            let cutoff = utc_date(
                now.saturating_sub(self.config.stats_retention_days * pinion_core::SECONDS_PER_DAY),
            );
            if let Err(err) = self.stats.prune_stats(&cutoff).await {
                warn!("stats pruning failed: {err}");
            }
        }

        debug!(
            unpinned = report.unpinned,
            rejected_purged = report.rejected_purged,
            gc_bytes_freed = report.gc_bytes_freed,
            "cleanup run finished"
        );
        let severity = if report.gc_error.is_some() || !report.errors.is_empty() {
            Severity::Warning
        } else {
            Severity::Info
        };
        emit(
            self.events.as_ref(),
            Event::new("cleanup.run", severity, "cleanup run finished", now)
                .with("unpinned", report.unpinned)
                .with("bytes_freed", report.bytes_freed)
                .with("rejected_purged", report.rejected_purged)
                .with("gc_removed_objects", report.gc_removed_objects)
                .with("gc_bytes_freed", report.gc_bytes_freed)
                .with("gc_duration_ms", report.gc_duration_ms)
                .with("overdue", report.overdue),
        )
        .await;
    }
}
