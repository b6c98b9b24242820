//! Error types for the JSON-RPC transport

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// One inbound line that could not be decoded.
///
/// Never fatal: the reader logs it and moves on to the next line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid JSON frame ({reason}): {line}")]
pub struct TransportDecodeError {
    /// Offending line, lossily decoded and truncated for logging
    pub line: String,
    pub reason: String,
}

/// Errors surfaced to the caller of a single request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("'{method}' timed out after {}s", .timeout.as_secs())]
    Timeout { method: String, timeout: Duration },

    #[error("transport closed")]
    TransportClosed,

    #[error("remote error [{code}]: {message}{}", data_suffix(.data))]
    Remote {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("failed to encode request: {0}")]
    Encode(String),
}

/// ` (data: ...)` when the remote error carried a payload.
fn data_suffix(data: &Option<Value>) -> String {
    match data {
        Some(data) => format!(" (data: {})", data),
        None => String::new(),
    }
}
