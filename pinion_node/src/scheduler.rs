//! Fixed-interval scheduling of the four workers.
//!
//! Each worker runs on its own independent interval task; workers never
//! invoke each other, and overlapping windows are tolerated because every
//! transition is forward-only and every external action is idempotent at
//! its target.

use crate::NodeDeps;
use crate::config::NodeConfig;
use crate::workers::{CleanupWorker, DiscoveryWorker, MigrationWorker, ValidationWorker};
use pinion_core::events::emit;
use pinion_core::{Event, EventSink, Notifier, Severity, unix_now};
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

pub struct Scheduler {
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn spawn(deps: &NodeDeps, config: &NodeConfig) -> Self {
        let discovery = Arc::new(DiscoveryWorker::new(
            deps.registry.clone(),
            deps.daemon.clone(),
            deps.events.clone(),
        ));
        let validation = Arc::new(ValidationWorker::new(
            deps.registry.clone(),
            deps.validator.clone(),
            deps.events.clone(),
        ));
        let migration = Arc::new(MigrationWorker::new(
            deps.registry.clone(),
            deps.supernode.clone(),
            deps.events.clone(),
            deps.stats.clone(),
            deps.notifier.clone(),
            config.migration.clone(),
        ));
        let cleanup = Arc::new(CleanupWorker::new(
            deps.registry.clone(),
            deps.daemon.clone(),
            deps.events.clone(),
            deps.stats.clone(),
            deps.notifier.clone(),
            config.cleanup.clone(),
        ));

        let handles = vec![
            spawn_periodic(
                "discovery",
                config.schedule.discovery_secs,
                deps.events.clone(),
                deps.notifier.clone(),
                move || {
                    let worker = discovery.clone();
                    async move { worker.run().await }
                },
            ),
            spawn_periodic(
                "validation",
                config.schedule.validation_secs,
                deps.events.clone(),
                deps.notifier.clone(),
                move || {
                    let worker = validation.clone();
                    async move { worker.run().await }
                },
            ),
            spawn_periodic(
                "migration",
                config.schedule.migration_secs,
                deps.events.clone(),
                deps.notifier.clone(),
                move || {
                    let worker = migration.clone();
                    async move { worker.run().await }
                },
            ),
            spawn_periodic(
                "cleanup",
                config.schedule.cleanup_secs,
                deps.events.clone(),
                deps.notifier.clone(),
                move || {
                    let worker = cleanup.clone();
                    async move { worker.run().await }
                },
            ),
        ];

        Self { handles }
    }

    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

/// Runs `run` on a fixed interval forever. A failing run is recorded as an
/// error event and alerted, then swallowed: the next tick proceeds
/// normally, and the scheduler can never be brought down by one worker.
fn spawn_periodic<F, Fut, R>(
    name: &'static str,
    interval_secs: u64,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn Notifier>,
    run: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send,
    R: Debug + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match run().await {
                Ok(report) => info!("{name} run finished: {report:?}"),
                Err(err) => {
                    error!("{name} run failed: {err:#}");
                    emit(
                        events.as_ref(),
                        Event::new(
                            format!("{name}.error"),
                            Severity::Error,
                            err.to_string(),
                            unix_now(),
                        ),
                    )
                    .await;
                    notifier
                        .notify(&format!("{name} run failed"), &err.to_string())
                        .await;
                }
            }
        }
    })
}
