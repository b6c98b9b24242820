//! Application layer for toolmux
//!
//! This crate contains the orchestration use case, port definitions, and
//! application configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::OrchestrationParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    reasoning_oracle::{OracleError, ReasoningOracle},
    tool_invoker::{InvokeError, ToolInvoker},
};
pub use use_cases::run_turn::{
    BUDGET_EXCEEDED_MESSAGE, DUPLICATE_CALL_MESSAGE, RunOutcome, RunTurnError, RunTurnInput,
    RunTurnOutput, RunTurnUseCase,
};
