use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonApiConfig {
    /// Base URL of the daemon's control API, e.g. `http://127.0.0.1:5001`.
    pub api_url: String,
    /// Fixed request timeout for every control call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}
