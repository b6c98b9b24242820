//! Domain layer for toolmux
//!
//! This crate contains the core types and pure logic of the control plane.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! - **Provider**: an independently running process exposing a named set of
//!   callable operations over JSON-RPC on stdio.
//! - **Tool**: one callable operation with a declared input shape.
//! - **Catalog**: the ordered tools a provider reports after its handshake.
//! - **Reasoning oracle**: the external LLM choosing the next action.
//! - **Orchestration run**: one bounded plan/act/observe loop for a single
//!   user request, recorded in a [`Transcript`].

pub mod oracle;
pub mod prompt;
pub mod provider;
pub mod tool;
pub mod transcript;

// Re-export commonly used types
pub use oracle::OracleDecision;
pub use prompt::DecisionPrompt;
pub use provider::{ProviderSpec, ProviderState, ProviderStatus};
pub use tool::{
    FieldShape, InputShape, ProviderTool, ToolDescriptor, ToolPayload, ToolReference,
    ToolReferenceError, shape_tool_result,
};
pub use transcript::{ChatMessage, DEFAULT_HISTORY_LIMIT, Role, Transcript, Turn};
