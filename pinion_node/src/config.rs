use pinion_daemon_api::DaemonApiConfig;
use pinion_supernode_api::SupernodeApiConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Full configuration of a pinion node, usually loaded from a TOML file.
/// Only the two control-plane URLs are mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub registry: RegistryConfig,
    pub daemon: DaemonApiConfig,
    pub supernode: SupernodeApiConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum RegistryConfig {
    /// Durable store; `path` is the directory holding the database file.
    Redb { path: PathBuf },
    /// Ephemeral store, lost on restart. Useful for trials and tests.
    Memory,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig::Redb {
            path: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum ValidatorConfig {
    /// Direct batch query against the gateway's authorization database.
    Allowlist { path: PathBuf },
    /// Delegated batch validation over HTTP.
    Remote {
        endpoint: String,
        #[serde(default = "default_validator_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig::Allowlist {
            path: PathBuf::from("authorized.redb"),
        }
    }
}

fn default_validator_timeout_secs() -> u64 {
    60
}

/// Per-worker invocation intervals. Workers are scheduled independently
/// and never invoke each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleConfig {
    #[serde(default = "default_discovery_secs")]
    pub discovery_secs: u64,
    #[serde(default = "default_validation_secs")]
    pub validation_secs: u64,
    #[serde(default = "default_migration_secs")]
    pub migration_secs: u64,
    #[serde(default = "default_cleanup_secs")]
    pub cleanup_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            discovery_secs: default_discovery_secs(),
            validation_secs: default_validation_secs(),
            migration_secs: default_migration_secs(),
            cleanup_secs: default_cleanup_secs(),
        }
    }
}

fn default_discovery_secs() -> u64 {
    300
}

fn default_validation_secs() -> u64 {
    300
}

fn default_migration_secs() -> u64 {
    900
}

fn default_cleanup_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Minimum pin age, in whole days, before migration may start.
    #[serde(default = "default_start_after_days")]
    pub start_after_days: u64,
    /// Oldest-first batch cap per run.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between pins of one run, bounding request rate at the target.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    /// Wait between a successful pin call and its verification, giving the
    /// target time to converge.
    #[serde(default = "default_propagation_delay_ms")]
    pub propagation_delay_ms: u64,
    /// Retry count above which a pin is reported as stuck. Reporting only;
    /// never removes a pin from eligibility.
    #[serde(default = "default_max_retries_alert")]
    pub max_retries_alert: u32,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            start_after_days: default_start_after_days(),
            batch_size: default_batch_size(),
            throttle_ms: default_throttle_ms(),
            propagation_delay_ms: default_propagation_delay_ms(),
            max_retries_alert: default_max_retries_alert(),
        }
    }
}

fn default_start_after_days() -> u64 {
    4
}

fn default_batch_size() -> usize {
    20
}

fn default_throttle_ms() -> u64 {
    500
}

fn default_propagation_delay_ms() -> u64 {
    2000
}

fn default_max_retries_alert() -> u32 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Minimum age before a migrated pin's local copy is reclaimed.
    #[serde(default = "default_delete_after_days")]
    pub delete_after_days: u64,
    /// Minimum age before a rejected pin is removed and purged.
    #[serde(default = "default_invalid_retention_days")]
    pub invalid_retention_days: u64,
    /// Age at which an accepted, unmigrated pin counts as overdue. Feeds
    /// alerting only.
    #[serde(default = "default_overdue_after_days")]
    pub overdue_after_days: u64,
    /// Daily aggregates older than this are pruned.
    #[serde(default = "default_stats_retention_days")]
    pub stats_retention_days: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            delete_after_days: default_delete_after_days(),
            invalid_retention_days: default_invalid_retention_days(),
            overdue_after_days: default_overdue_after_days(),
            stats_retention_days: default_stats_retention_days(),
        }
    }
}

fn default_delete_after_days() -> u64 {
    7
}

fn default_invalid_retention_days() -> u64 {
    2
}

fn default_overdue_after_days() -> u64 {
    14
}

fn default_stats_retention_days() -> u64 {
    90
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Optional webhook for best-effort alerts. Unset means log-only.
    #[serde(default)]
    pub webhook_url: Option<String>,
}
