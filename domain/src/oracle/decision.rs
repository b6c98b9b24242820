//! Parsing of free-text oracle answers into a tagged decision.
//!
//! The oracle is asked to reply with one of two JSON shapes:
//!
//! ```json
//! {"action": "tool", "tool": "provider.name", "arguments": {...}}
//! {"action": "response", "message": "..."}
//! ```
//!
//! Nothing guarantees that it does. The text is parsed defensively:
//! Markdown code fences are stripped, and anything that does not match a
//! shape becomes [`OracleDecision::Unparseable`] carrying the raw text.
//!
//! Precedence, checked in order:
//!
//! 1. `action == "response"` → final answer from `message`, then `final`,
//!    then `response`; unparseable if none is a string.
//! 2. `action == "tool"` → tool call with whatever `tool` holds (possibly
//!    empty; reference validation happens later).
//! 3. `action` present with any other value → unparseable.
//! 4. no `action`: a string `tool` field → tool call; otherwise a string
//!    `message`/`final`/`response` → final answer; otherwise unparseable.

use serde_json::{Map, Value};

/// What the oracle asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleDecision {
    /// Invoke one tool. `tool` is the unvalidated `provider.tool` reference.
    ToolCall { tool: String, arguments: Value },
    /// Final natural-language answer
    FinalAnswer(String),
    /// Output matching neither shape; carries the trimmed raw text
    Unparseable(String),
}

impl OracleDecision {
    pub fn parse(raw: &str) -> Self {
        let cleaned = strip_code_fences(raw);

        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(cleaned) else {
            return Self::Unparseable(raw.trim().to_string());
        };

        match obj.get("action").map(|a| a.as_str()) {
            Some(Some("response")) => match final_text(&obj) {
                Some(message) => Self::FinalAnswer(message),
                None => Self::Unparseable(raw.trim().to_string()),
            },
            Some(Some("tool")) => Self::tool_call(&obj),
            Some(_) => Self::Unparseable(raw.trim().to_string()),
            None => {
                if obj.get("tool").is_some_and(|t| t.is_string()) {
                    Self::tool_call(&obj)
                } else if let Some(message) = final_text(&obj) {
                    Self::FinalAnswer(message)
                } else {
                    Self::Unparseable(raw.trim().to_string())
                }
            }
        }
    }

    fn tool_call(obj: &Map<String, Value>) -> Self {
        let tool = obj
            .get("tool")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        let arguments = match obj.get("arguments") {
            Some(Value::Object(args)) => Value::Object(args.clone()),
            _ => Value::Object(Map::new()),
        };
        Self::ToolCall { tool, arguments }
    }
}

fn final_text(obj: &Map<String, Value>) -> Option<String> {
    ["message", "final", "response"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tool_call() {
        let d = OracleDecision::parse(
            r#"{"action":"tool","tool":"docs.search_docs","arguments":{"query":"install"}}"#,
        );
        assert_eq!(
            d,
            OracleDecision::ToolCall {
                tool: "docs.search_docs".into(),
                arguments: json!({"query": "install"}),
            }
        );
    }

    #[test]
    fn test_parse_final_answer() {
        let d = OracleDecision::parse(r#"{"action":"response","message":"Found 1 result"}"#);
        assert_eq!(d, OracleDecision::FinalAnswer("Found 1 result".into()));
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "```json\n{\"action\":\"response\",\"message\":\"hi\"}\n```";
        assert_eq!(
            OracleDecision::parse(raw),
            OracleDecision::FinalAnswer("hi".into())
        );
    }

    #[test]
    fn test_parse_plain_text_is_unparseable() {
        let d = OracleDecision::parse("  Sure, here is what I found. ");
        assert_eq!(
            d,
            OracleDecision::Unparseable("Sure, here is what I found.".into())
        );
    }

    #[test]
    fn test_parse_non_object_json_is_unparseable() {
        assert_eq!(
            OracleDecision::parse("[1, 2]"),
            OracleDecision::Unparseable("[1, 2]".into())
        );
    }

    #[test]
    fn test_tool_action_wins_over_message_field() {
        let d = OracleDecision::parse(
            r#"{"action":"tool","tool":"jira.search_issues","message":"searching"}"#,
        );
        assert!(matches!(d, OracleDecision::ToolCall { .. }));
    }

    #[test]
    fn test_tool_action_without_tool_yields_empty_reference() {
        let d = OracleDecision::parse(r#"{"action":"tool","arguments":[1]}"#);
        assert_eq!(
            d,
            OracleDecision::ToolCall {
                tool: String::new(),
                arguments: json!({}),
            }
        );
    }

    #[test]
    fn test_response_action_falls_back_to_other_fields() {
        let d = OracleDecision::parse(r#"{"action":"response","final":"done"}"#);
        assert_eq!(d, OracleDecision::FinalAnswer("done".into()));
    }

    #[test]
    fn test_response_action_without_text_is_unparseable() {
        let raw = r#"{"action":"response"}"#;
        assert_eq!(
            OracleDecision::parse(raw),
            OracleDecision::Unparseable(raw.into())
        );
    }

    #[test]
    fn test_missing_action_uses_fields() {
        assert!(matches!(
            OracleDecision::parse(r#"{"tool":"slack.list_channels"}"#),
            OracleDecision::ToolCall { .. }
        ));
        assert_eq!(
            OracleDecision::parse(r#"{"message":"hello"}"#),
            OracleDecision::FinalAnswer("hello".into())
        );
    }

    #[test]
    fn test_unknown_action_is_unparseable() {
        assert!(matches!(
            OracleDecision::parse(r#"{"action":"dance","message":"x"}"#),
            OracleDecision::Unparseable(_)
        ));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {} "), "{}");
    }
}
