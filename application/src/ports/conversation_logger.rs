//! Conversation log port
//!
//! One orchestration run emits, in order:
//!
//! | event type        | payload                                        |
//! |-------------------|------------------------------------------------|
//! | `oracle_decision` | `iteration`, `kind` (`tool_call`/`final_answer`/`unparseable`), `tool` |
//! | `tool_call`       | `iteration`, `tool`, `arguments`               |
//! | `tool_result`     | `tool`, `bytes` of shaped output               |
//! | `tool_error`      | `tool`, `message`                              |
//! | `run_complete`    | `outcome`, `iterations`, `tools_used`          |
//!
//! `tracing` carries operator diagnostics; this port carries the run record.

use serde_json::Value;

/// One entry of the run record. The sink stamps time and sequence.
#[derive(Debug, Clone)]
pub struct ConversationEvent {
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub const ORACLE_DECISION: &'static str = "oracle_decision";
    pub const TOOL_CALL: &'static str = "tool_call";
    pub const TOOL_RESULT: &'static str = "tool_result";
    pub const TOOL_ERROR: &'static str = "tool_error";
    pub const RUN_COMPLETE: &'static str = "run_complete";

    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// `tool` field of the payload, for tool-related events.
    pub fn tool(&self) -> Option<&str> {
        self.payload.get("tool").and_then(Value::as_str)
    }
}

/// Receives run events. Must not fail the run: sinks absorb their own I/O errors.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// Discards every event.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
