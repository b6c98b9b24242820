//! Tool invoker port
//!
//! Defines how the application layer reads the aggregated catalog and
//! executes a single tool on a named provider.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use toolmux_domain::ProviderTool;

/// Why a tool invocation failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvokeError {
    #[error("provider '{0}' is not running")]
    ProviderUnavailable(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("provider '{0}' closed its transport")]
    TransportClosed(String),

    /// Error payload returned by the provider, kept as sent.
    #[error("provider error [{code}]: {message}{}", data_suffix(.data))]
    Remote {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("{0}")]
    Other(String),
}

fn data_suffix(data: &Option<Value>) -> String {
    match data {
        Some(data) => format!(" (data: {})", data),
        None => String::new(),
    }
}

/// Port for tool discovery and execution.
///
/// Implemented by the process supervisor in the infrastructure layer.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Aggregated catalog across all ready providers.
    fn catalog(&self) -> Vec<ProviderTool>;

    /// Execute `tool` on `provider`, returning the raw result payload.
    async fn call_tool(
        &self,
        provider: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, InvokeError>;
}
