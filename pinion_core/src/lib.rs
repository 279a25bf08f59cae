//! Core pinion types and traits.
//!
//! This crate defines the shared vocabulary used by all pinion crates:
//!
//! ## Persisted types
//!
//! - Content identifiers (`cid::ContentId`)
//! - Pin lifecycle rows (`pin::Pin`, `pin::PinStatus`)
//! - Audit events (`events::Event`, `events::Severity`)
//! - Daily aggregates (`stats::MigrationDayStats`, `stats::CleanupDayStats`)
//!
//! These are encoded with minicbor when stored; changing their field
//! indices is a persistence-format change.
//!
//! ## Component seams
//!
//! The orchestration workers in `pinion_node` only ever talk to their
//! collaborators through the traits defined here:
//!
//! - `registry::PinRegistry` — the durable pin registry, sole source of
//!   truth for orchestration decisions; implementations in
//!   `pinion_registry_redb` and `pinion_registry_memory`
//! - `daemon::StorageNode` — the local storage daemon's control plane;
//!   implementation in `pinion_daemon_api`
//! - `supernode::ReplicationTarget` — the durable replication target;
//!   implementation in `pinion_supernode_api`
//! - `validate::Validator` — the batch authorization source;
//!   implementations in `pinion_validator_allowlist` and
//!   `pinion_validator_http`
//! - `events::EventSink` and `notify::Notifier` — fire-and-forget
//!   observability sinks
//!
//! All components are constructed explicitly and handed to the workers at
//! construction time; there is no ambient global state anywhere in the
//! workspace.

pub mod cid;
pub mod daemon;
pub mod events;
pub mod notify;
pub mod pin;
pub mod registry;
pub mod stats;
pub mod supernode;
pub mod validate;

// Test utilities (behind feature flag)
#[cfg(feature = "testutil")]
pub mod testutil;

pub use cid::ContentId;
pub use daemon::{PinRemoval, RepoGcResult, RepoStat, StorageNode};
pub use events::{Event, EventSink, Severity};
pub use notify::{LogNotifier, Notifier};
pub use pin::{Pin, PinStatus, SECONDS_PER_DAY};
pub use registry::{PinQuery, PinRegistry};
pub use stats::{CleanupDayStats, MigrationDayStats, StatsStore, utc_date};
pub use supernode::ReplicationTarget;
pub use validate::Validator;

/// Current wall-clock time as unix seconds.
///
/// All lifecycle timestamps and age computations in pinion use this single
/// representation; ages are derived at query time, never cached.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
