//! Structured conversation logging.
//!
//! Provides [`JsonlConversationLogger`], an append-only JSONL sink for the
//! [`ConversationLogger`](toolmux_application::ConversationLogger) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlConversationLogger;
