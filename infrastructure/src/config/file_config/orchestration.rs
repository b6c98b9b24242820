//! Orchestration configuration from TOML (`[orchestration]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolmux_application::OrchestrationParams;

/// Raw orchestration configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestrationConfig {
    /// Oracle round-trips per request before giving up
    pub max_iterations: usize,
    /// Chat history messages carried into each request
    pub history_limit: usize,
    /// Per JSON-RPC request timeout
    pub request_timeout_secs: u64,
}

impl Default for FileOrchestrationConfig {
    fn default() -> Self {
        let params = OrchestrationParams::default();
        Self {
            max_iterations: params.max_iterations,
            history_limit: params.history_limit,
            request_timeout_secs: 30,
        }
    }
}

impl FileOrchestrationConfig {
    pub fn to_params(&self) -> OrchestrationParams {
        OrchestrationParams::default()
            .with_max_iterations(self.max_iterations)
            .with_history_limit(self.history_limit)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
