//! Provider domain entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How to launch a provider process.
///
/// The environment map is an overlay on top of the parent environment; its
/// contents (typically credentials) are opaque to the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Unique provider name (e.g., "github")
    pub name: String,
    /// Executable to run
    pub command: String,
    /// Command-line arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the child
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory for the child (inherits ours when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// Liveness of a provider entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderState {
    /// Process spawned, handshake in progress
    Starting,
    /// Handshake and catalog fetch succeeded
    Ready,
    /// Process stopped or exited (terminal)
    Stopped,
}

impl ProviderState {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderState::Starting => "starting",
            ProviderState::Ready => "ready",
            ProviderState::Stopped => "stopped",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ProviderState::Ready)
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time view of one registered provider, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub state: ProviderState,
    pub tool_count: usize,
}
