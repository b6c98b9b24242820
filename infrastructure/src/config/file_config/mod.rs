//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to domain/application types
//! at the edges.

mod logging;
mod oracle;
mod orchestration;
mod providers;
mod repl;

pub use logging::FileLoggingConfig;
pub use oracle::FileOracleConfig;
pub use orchestration::FileOrchestrationConfig;
pub use providers::FileProviderConfig;
pub use repl::FileReplConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use toolmux_domain::ProviderSpec;

/// How serious a configuration issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The configuration cannot work.
    Error,
    /// Works, but probably not as intended.
    Warning,
}

/// A problem found by [`FileConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub message: String,
}

impl ConfigIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub orchestration: FileOrchestrationConfig,
    pub oracle: FileOracleConfig,
    pub logging: FileLoggingConfig,
    pub repl: FileReplConfig,
    pub providers: Vec<FileProviderConfig>,
}

impl FileConfig {
    /// Launch specs for every enabled provider, in file order.
    pub fn provider_specs(&self) -> Vec<ProviderSpec> {
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .map(FileProviderConfig::to_spec)
            .collect()
    }

    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.orchestration.max_iterations == 0 {
            issues.push(ConfigIssue::error(
                "orchestration.max_iterations must be at least 1",
            ));
        }
        if self.orchestration.request_timeout_secs == 0 {
            issues.push(ConfigIssue::error(
                "orchestration.request_timeout_secs cannot be 0",
            ));
        }
        if self.oracle.model.trim().is_empty() {
            issues.push(ConfigIssue::error("oracle.model cannot be empty"));
        }

        let mut seen = HashSet::new();
        for (i, provider) in self.providers.iter().enumerate() {
            let name = provider.name.trim();
            if name.is_empty() {
                issues.push(ConfigIssue::error(format!(
                    "providers[{}]: name cannot be empty",
                    i
                )));
                continue;
            }
            if name.contains('.') {
                issues.push(ConfigIssue::error(format!(
                    "provider '{}': name cannot contain '.' (tools are addressed as provider.tool)",
                    name
                )));
            }
            if !seen.insert(name) {
                issues.push(ConfigIssue::error(format!(
                    "provider '{}' is defined more than once",
                    name
                )));
            }
            if provider.command.trim().is_empty() {
                issues.push(ConfigIssue::error(format!(
                    "provider '{}': command cannot be empty",
                    name
                )));
            }
        }

        if !self.providers.iter().any(|p| p.enabled) {
            issues.push(ConfigIssue::warning(
                "no providers configured; the oracle will have no tools",
            ));
        }

        issues
    }
}

/// Expand a leading `~/` to the home directory.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
