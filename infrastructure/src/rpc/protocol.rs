//! JSON-RPC 2.0 message types for provider communication.
//!
//! # Protocol Overview
//!
//! - **Requests**: control plane → provider (`initialize`, `tools/list`, `tools/call`)
//! - **Responses**: provider → control plane (`result` or `error`, matched by `id`)
//! - **Notifications**: provider → control plane (`method`, no `id`)

use super::error::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Code used when a provider's `error` member carries no integer `code`.
pub const INTERNAL_ERROR: i64 = -32603;

/// Process-wide request ID counter. IDs are never reused.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Generates a unique request ID.
pub fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with an auto-generated ID.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: next_id(),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<Value>,
}

/// Turn any `error` member into [`RpcError::Remote`].
///
/// A well-formed error object maps field by field. Anything else keeps the
/// raw value in `data`, with the code defaulting to [`INTERNAL_ERROR`].
pub fn remote_error(error: Value) -> RpcError {
    if let Ok(obj) = serde_json::from_value::<JsonRpcErrorObject>(error.clone()) {
        return obj.into();
    }

    let code = error
        .get("code")
        .and_then(Value::as_i64)
        .unwrap_or(INTERNAL_ERROR);
    let message = match &error {
        Value::String(s) => s.clone(),
        Value::Object(obj) => match obj.get("message") {
            Some(Value::String(s)) => s.clone(),
            _ => error.to_string(),
        },
        other => other.to_string(),
    };

    RpcError::Remote {
        code,
        message,
        data: Some(error),
    }
}

impl From<JsonRpcErrorObject> for RpcError {
    fn from(err: JsonRpcErrorObject) -> Self {
        RpcError::Remote {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

/// Classification of an inbound message.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// Reply to one of our requests.
    Response {
        id: u64,
        outcome: Result<Value, RpcError>,
    },
    /// Server-initiated request (has `id` and `method`). Not supported.
    Request { id: Value, method: String },
    /// Notification (has `method`, no `id`).
    Notification { method: String, params: Value },
    /// Well-formed JSON that fits none of the above.
    Unrecognized,
}

/// Classify an inbound JSON value by inspecting `id` / `method` / `error`.
///
/// Any `error` member, well-formed or not, fails the request. A response
/// carrying neither `result` nor `error` resolves with `null`.
pub fn classify(msg: Value) -> Inbound {
    let Value::Object(mut obj) = msg else {
        return Inbound::Unrecognized;
    };

    let id = obj.remove("id").filter(|id| !id.is_null());
    let method = obj
        .get("method")
        .and_then(|m| m.as_str())
        .map(str::to_string);

    match (id, method) {
        (Some(id), Some(method)) => Inbound::Request { id, method },
        (Some(id), None) => {
            let Some(id) = id.as_u64() else {
                return Inbound::Unrecognized;
            };
            let outcome = match obj.remove("error").filter(|e| !e.is_null()) {
                Some(error) => Err(remote_error(error)),
                None => Ok(obj.remove("result").unwrap_or(Value::Null)),
            };
            Inbound::Response { id, outcome }
        }
        (None, Some(method)) => Inbound::Notification {
            method,
            params: obj.remove("params").unwrap_or(Value::Null),
        },
        (None, None) => Inbound::Unrecognized,
    }
}
