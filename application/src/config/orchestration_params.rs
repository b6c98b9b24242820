//! Orchestration parameters: decision loop control.
//!
//! [`OrchestrationParams`] groups the static limits applied to every run of
//! [`RunTurnUseCase`](crate::use_cases::run_turn::RunTurnUseCase).

use serde::{Deserialize, Serialize};
use toolmux_domain::DEFAULT_HISTORY_LIMIT;

/// Default hard cap on oracle round-trips per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Orchestration loop control parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationParams {
    /// Maximum oracle round-trips before the run gives up.
    pub max_iterations: usize,
    /// Maximum number of caller history messages carried into a run.
    pub history_limit: usize,
}

impl Default for OrchestrationParams {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl OrchestrationParams {
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = OrchestrationParams::default();
        assert_eq!(params.max_iterations, 10);
        assert_eq!(params.history_limit, 20);
    }

    #[test]
    fn test_builders() {
        let params = OrchestrationParams::default()
            .with_max_iterations(3)
            .with_history_limit(4);
        assert_eq!(params.max_iterations, 3);
        assert_eq!(params.history_limit, 4);
    }
}
