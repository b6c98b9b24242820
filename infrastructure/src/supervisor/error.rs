//! Error types for the process supervisor

use crate::rpc::RpcError;
use thiserror::Error;
use toolmux_application::InvokeError;

/// Errors from starting, stopping, or calling into providers.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("provider '{0}' is not running")]
    ProviderUnavailable(String),

    #[error("failed to spawn provider '{name}': {reason}")]
    SpawnFailed { name: String, reason: String },

    #[error("provider '{name}' handshake failed: {reason}")]
    HandshakeFailure { name: String, reason: String },

    #[error("provider '{name}': {source}")]
    Rpc {
        name: String,
        #[source]
        source: RpcError,
    },
}

impl From<SupervisorError> for InvokeError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::ProviderUnavailable(name) => InvokeError::ProviderUnavailable(name),
            SupervisorError::Rpc { name, source } => match source {
                RpcError::Timeout { timeout, .. } => InvokeError::Timeout(timeout.as_secs()),
                RpcError::TransportClosed => InvokeError::TransportClosed(name),
                RpcError::Remote {
                    code,
                    message,
                    data,
                } => InvokeError::Remote {
                    code,
                    message,
                    data,
                },
                RpcError::Encode(reason) => InvokeError::Other(reason),
            },
            other => InvokeError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_maps_to_invoke_error() {
        let err = SupervisorError::Rpc {
            name: "docs".into(),
            source: RpcError::Timeout {
                method: "tools/call".into(),
                timeout: Duration::from_secs(30),
            },
        };
        assert_eq!(InvokeError::from(err), InvokeError::Timeout(30));

        let err = SupervisorError::ProviderUnavailable("jira".into());
        assert_eq!(
            InvokeError::from(err),
            InvokeError::ProviderUnavailable("jira".into())
        );

        let err = SupervisorError::Rpc {
            name: "jira".into(),
            source: RpcError::TransportClosed,
        };
        assert_eq!(
            InvokeError::from(err),
            InvokeError::TransportClosed("jira".into())
        );

        let err = SupervisorError::Rpc {
            name: "github".into(),
            source: RpcError::Remote {
                code: -32000,
                message: "repo not found".into(),
                data: Some(json!({"repo": "acme/widgets"})),
            },
        };
        let mapped = InvokeError::from(err);
        assert_eq!(
            mapped,
            InvokeError::Remote {
                code: -32000,
                message: "repo not found".into(),
                data: Some(json!({"repo": "acme/widgets"})),
            }
        );
        assert!(mapped.to_string().contains(r#"(data: {"repo":"acme/widgets"})"#));
    }
}
