//! Provider process definitions from TOML (`[[providers]]` array)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use toolmux_domain::ProviderSpec;

/// One `[[providers]]` entry.
///
/// # Example
///
/// ```toml
/// [[providers]]
/// name = "github"
/// command = "node"
/// args = ["mcp-servers/github-server/index.js"]
/// forward_env = ["GITHUB_TOKEN"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileProviderConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Literal environment overlay
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Variables copied from our own environment when set
    #[serde(default)]
    pub forward_env: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    /// Skip this provider at startup
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl FileProviderConfig {
    /// Build a launch spec, resolving `forward_env` against `lookup`.
    ///
    /// Literal `env` entries win over forwarded ones.
    pub fn to_spec_with(&self, lookup: impl Fn(&str) -> Option<String>) -> ProviderSpec {
        let mut env = BTreeMap::new();
        for key in &self.forward_env {
            if let Some(value) = lookup(key) {
                env.insert(key.clone(), value);
            }
        }
        env.extend(self.env.clone());

        ProviderSpec {
            name: self.name.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            env,
            cwd: self.cwd.as_deref().map(|c| super::expand_home(c).to_string_lossy().into_owned()),
        }
    }

    /// Build a launch spec from the current process environment.
    pub fn to_spec(&self) -> ProviderSpec {
        self.to_spec_with(|key| std::env::var(key).ok())
    }
}
