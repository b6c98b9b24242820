//! Reasoning oracle port
//!
//! Defines the single request/response call the orchestration loop makes to
//! the external LLM.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the oracle call itself (not from parsing its answer).
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle not configured: {0}")]
    NotConfigured(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Oracle returned no text")]
    EmptyResponse,
}

/// The external reasoning oracle.
///
/// Takes a fully rendered prompt and returns free text that is expected, but
/// not guaranteed, to be one of the decision shapes understood by
/// [`OracleDecision::parse`](toolmux_domain::OracleDecision::parse).
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}
