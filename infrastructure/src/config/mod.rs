//! Configuration file loading for toolmux
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLMUX_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./toolmux.toml` or `./.toolmux.toml`
//! 4. Global: `$XDG_CONFIG_HOME/toolmux/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, FileConfig, FileLoggingConfig, FileOracleConfig, FileOrchestrationConfig,
    FileProviderConfig, FileReplConfig, Severity,
};
pub use loader::ConfigLoader;
