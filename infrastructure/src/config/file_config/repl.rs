//! Chat REPL configuration from TOML (`[repl]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw REPL configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileReplConfig {
    /// Show the tools-used summary after each answer
    pub show_thinking: bool,
    /// Path to the line-editor history file (`~` is expanded).
    /// Defaults to `$XDG_DATA_HOME/toolmux/history.txt`.
    pub history_file: Option<String>,
}

impl Default for FileReplConfig {
    fn default() -> Self {
        Self {
            show_thinking: true,
            history_file: None,
        }
    }
}

impl FileReplConfig {
    pub fn history_path(&self) -> Option<PathBuf> {
        match self.history_file.as_deref() {
            Some(path) => Some(super::expand_home(path)),
            None => dirs::data_dir().map(|d| d.join("toolmux").join("history.txt")),
        }
    }
}
