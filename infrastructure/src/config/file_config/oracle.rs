//! Reasoning oracle configuration from TOML (`[oracle]` section)

use serde::{Deserialize, Serialize};

/// Raw oracle configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOracleConfig {
    /// Gemini model name
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Override for the API base URL
    pub base_url: Option<String>,
}

impl Default for FileOracleConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: None,
        }
    }
}
