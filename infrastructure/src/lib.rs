//! Infrastructure layer for toolmux
//!
//! This crate contains the adapters behind the application ports: provider
//! processes and their JSON-RPC transport, the Gemini reasoning oracle,
//! configuration loading, and the JSONL conversation log.

pub mod config;
pub mod logging;
pub mod oracle;
pub mod rpc;
pub mod supervisor;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigLoader, FileConfig, Severity};
pub use logging::JsonlConversationLogger;
pub use oracle::GeminiOracle;
pub use rpc::{Correlator, Notification, RpcError};
pub use supervisor::{ProcessSupervisor, SupervisorError, SupervisorStatus, ToolRegistry};
