//! Interactive chat module
//!
//! Provides a line-editor chat interface that keeps bounded conversation
//! history across requests.

mod repl;

pub use repl::ChatRepl;
