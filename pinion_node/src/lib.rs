//! Worker orchestration and node lifecycle.
//!
//! `run_node` builds every component explicitly from the node config —
//! state store, control-plane clients, validation source, notifier — and
//! hands them to the scheduler. Workers receive their collaborators at
//! construction time and only ever coordinate through registry state.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use pinion_core::{
    EventSink, LogNotifier, Notifier, PinRegistry, ReplicationTarget, StatsStore, StorageNode,
    Validator,
};
use pinion_daemon_api::DaemonClient;
use pinion_registry_memory::MemoryStateStore;
use pinion_registry_redb::RedbStateStore;
use pinion_supernode_api::SupernodeClient;
use pinion_validator_allowlist::AllowlistValidator;
use pinion_validator_http::HttpValidator;

pub mod admin;
pub mod config;
mod notify;
pub mod scheduler;
pub mod workers;

pub use notify::WebhookNotifier;

use config::{NodeConfig, NotifyConfig, RegistryConfig, ValidatorConfig};

/// Explicitly constructed collaborators shared by the workers and the
/// manual admin entry points.
#[derive(Clone)]
pub struct NodeDeps {
    pub registry: Arc<dyn PinRegistry>,
    pub events: Arc<dyn EventSink>,
    pub stats: Arc<dyn StatsStore>,
    pub daemon: Arc<dyn StorageNode>,
    pub supernode: Arc<dyn ReplicationTarget>,
    pub validator: Arc<dyn Validator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Opens the configured state store. One concrete store backs all three
/// persistence seams.
pub fn create_state_store(
    config: &RegistryConfig,
) -> Result<(Arc<dyn PinRegistry>, Arc<dyn EventSink>, Arc<dyn StatsStore>)> {
    match config {
        RegistryConfig::Redb { path } => {
            let store = Arc::new(RedbStateStore::open(path)?);
            Ok((store.clone(), store.clone(), store))
        }
        RegistryConfig::Memory => {
            let store = Arc::new(MemoryStateStore::new());
            Ok((store.clone(), store.clone(), store))
        }
    }
}

pub fn create_validator(config: &ValidatorConfig) -> Arc<dyn Validator> {
    match config {
        ValidatorConfig::Allowlist { path } => Arc::new(AllowlistValidator::new(path.clone())),
        ValidatorConfig::Remote {
            endpoint,
            timeout_secs,
        } => Arc::new(HttpValidator::new(
            endpoint.clone(),
            Duration::from_secs(*timeout_secs),
        )),
    }
}

pub fn create_notifier(config: &NotifyConfig) -> Arc<dyn Notifier> {
    match &config.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    }
}

pub fn build_deps(config: &NodeConfig) -> Result<NodeDeps> {
    let (registry, events, stats) = create_state_store(&config.registry)?;
    let daemon = Arc::new(DaemonClient::create(config.daemon.clone())?);
    let supernode = Arc::new(SupernodeClient::create(config.supernode.clone())?);
    let validator = create_validator(&config.validator);
    let notifier = create_notifier(&config.notify);
    Ok(NodeDeps {
        registry,
        events,
        stats,
        daemon,
        supernode,
        validator,
        notifier,
    })
}

/// Starts the scheduled workers and runs until interrupted.
pub async fn run_node(config: NodeConfig) -> Result<()> {
    let deps = build_deps(&config)?;

    if !deps.daemon.is_running().await? {
        tracing::warn!("storage daemon is not reachable yet; workers will retry on schedule");
    }

    let scheduler = scheduler::Scheduler::spawn(&deps, &config);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    scheduler.shutdown();
    Ok(())
}
