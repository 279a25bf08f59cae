//! Manual entry points for the admin surface.
//!
//! These reuse the same registry and adapter contracts as the scheduled
//! workers; there is no separate code path for operator actions.

use crate::NodeDeps;
use crate::config::{CleanupConfig, MigrationConfig};
use crate::workers::{
    CleanupReport, CleanupWorker, DiscoveryReport, DiscoveryWorker, MigrationReport,
    MigrationWorker, ValidationReport, ValidationWorker,
};
use anyhow::{Context, Result};
use pinion_core::events::emit;
use pinion_core::{ContentId, Event, Pin, Severity, unix_now};

pub async fn run_discovery(deps: &NodeDeps) -> Result<DiscoveryReport> {
    DiscoveryWorker::new(
        deps.registry.clone(),
        deps.daemon.clone(),
        deps.events.clone(),
    )
    .run()
    .await
}

pub async fn run_validation(deps: &NodeDeps) -> Result<ValidationReport> {
    ValidationWorker::new(
        deps.registry.clone(),
        deps.validator.clone(),
        deps.events.clone(),
    )
    .run()
    .await
}

pub async fn run_migration(deps: &NodeDeps, config: MigrationConfig) -> Result<MigrationReport> {
    MigrationWorker::new(
        deps.registry.clone(),
        deps.supernode.clone(),
        deps.events.clone(),
        deps.stats.clone(),
        deps.notifier.clone(),
        config,
    )
    .run()
    .await
}

pub async fn run_cleanup(deps: &NodeDeps, config: CleanupConfig) -> Result<CleanupReport> {
    CleanupWorker::new(
        deps.registry.clone(),
        deps.daemon.clone(),
        deps.events.clone(),
        deps.stats.clone(),
        deps.notifier.clone(),
        config,
    )
    .run()
    .await
}

/// Pins the identifier on the daemon and starts tracking it as pending.
/// Returns `false` when the identifier was already tracked.
pub async fn pin_add(deps: &NodeDeps, id: &ContentId) -> Result<bool> {
    deps.daemon.pin_add(id).await?;
    let size_bytes = deps.daemon.stat_object_size(id).await.ok();
    let added = deps
        .registry
        .insert_if_absent(Pin::discovered(id.clone(), size_bytes, unix_now()))
        .await?;
    emit(
        deps.events.as_ref(),
        Event::new("admin.pin_add", Severity::Info, "pin added manually", unix_now())
            .with("id", id),
    )
    .await;
    Ok(added)
}

/// Removes the local pin and drops the registry row. Content that is
/// already absent on the daemon is tolerated.
pub async fn pin_remove(deps: &NodeDeps, id: &ContentId) -> Result<()> {
    deps.daemon.pin_remove(id).await?;
    deps.registry.delete(id).await?;
    emit(
        deps.events.as_ref(),
        Event::new(
            "admin.pin_remove",
            Severity::Info,
            "pin removed manually",
            unix_now(),
        )
        .with("id", id),
    )
    .await;
    Ok(())
}

/// Migrates one pin right now, skipping the age gate. Like the scheduled
/// path this does not inspect `status`: force-migrating a rejected pin
/// leaves a row that is both rejected and migrated, and the rejected
/// cleanup pass will still purge it at retention age.
pub async fn force_migrate(deps: &NodeDeps, config: MigrationConfig, id: &ContentId) -> Result<()> {
    let pin = deps
        .registry
        .get(id)
        .await?
        .with_context(|| format!("{id} is not tracked"))?;
    let worker = MigrationWorker::new(
        deps.registry.clone(),
        deps.supernode.clone(),
        deps.events.clone(),
        deps.stats.clone(),
        deps.notifier.clone(),
        config,
    );
    worker.migrate_pin(&pin).await?;
    emit(
        deps.events.as_ref(),
        Event::new(
            "admin.force_migrate",
            Severity::Info,
            "pin migrated manually",
            unix_now(),
        )
        .with("id", id),
    )
    .await;
    Ok(())
}
