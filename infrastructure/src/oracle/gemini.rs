//! Google Gemini `generateContent` adapter for the reasoning oracle port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolmux_application::{OracleError, ReasoningOracle};
use tracing::{debug, trace};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Reasoning oracle backed by the Gemini REST API.
pub struct GeminiOracle {
    client: reqwest::Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl GeminiOracle {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| OracleError::NotConfigured(e.to_string()))?;
        Ok(Self {
            client,
            model: model.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Read the API key from the environment variable `api_key_env`.
    pub fn from_env(model: impl Into<String>, api_key_env: &str) -> Result<Self, OracleError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                OracleError::NotConfigured(format!("environment variable {} is not set", api_key_env))
            })?;
        Self::new(model, api_key)
    }

    /// Override the API endpoint (e.g. a proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ReasoningOracle for GeminiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(model = %self.model, prompt_bytes = prompt.len(), "Calling Gemini");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(OracleError::RequestFailed(format!(
                "HTTP {}: {}",
                status,
                detail.trim()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::RequestFailed(format!("invalid response body: {}", e)))?;

        let text = parsed.text().ok_or(OracleError::EmptyResponse)?;
        trace!(model = %self.model, "Gemini response: {}", text);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["contents"][0]["role"], "user");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"action\":"},{"text":"\"response\"}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some(r#"{"action":"response"}"#));
    }

    #[test]
    fn test_response_without_candidates() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn test_endpoint() {
        let oracle = GeminiOracle::new("gemini-2.5-flash", "k")
            .unwrap()
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(
            oracle.endpoint(),
            "http://localhost:8080/v1/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_from_env_missing_key() {
        let result = GeminiOracle::from_env(DEFAULT_MODEL, "TOOLMUX_TEST_UNSET_KEY_VAR");
        assert!(matches!(result, Err(OracleError::NotConfigured(_))));
    }
}
