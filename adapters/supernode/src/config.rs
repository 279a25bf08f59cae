use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupernodeApiConfig {
    /// Base URL of the supernode's control API.
    pub api_url: String,
    #[serde(default)]
    pub timeouts: SupernodeTimeouts,
}

/// Parameters of the size-scaled pin timeout.
///
/// The target fetches content before answering a pin call, so larger
/// payloads are given proportionally more time: one `step` per started
/// 100 MiB on top of `base`, capped at `max`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupernodeTimeouts {
    #[serde(default = "default_base_secs")]
    pub base_secs: u64,
    #[serde(default = "default_step_secs")]
    pub step_secs: u64,
    #[serde(default = "default_max_secs")]
    pub max_secs: u64,
}

impl Default for SupernodeTimeouts {
    fn default() -> Self {
        Self {
            base_secs: default_base_secs(),
            step_secs: default_step_secs(),
            max_secs: default_max_secs(),
        }
    }
}

fn default_base_secs() -> u64 {
    120
}

fn default_step_secs() -> u64 {
    60
}

fn default_max_secs() -> u64 {
    3600
}
