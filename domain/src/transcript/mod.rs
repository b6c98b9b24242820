//! Conversation transcript for one orchestration run.
//!
//! The caller supplies prior chat history as [`ChatMessage`]s; the run then
//! appends oracle decisions, tool results and tool errors as it goes. The
//! transcript is rendered to plain text and embedded in every oracle prompt.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default number of history messages carried into a run.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Author of a caller-supplied chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A message from the caller's chat history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// User utterance
    User(String),
    /// Final message from the oracle (earlier runs, or this run's answer)
    Assistant(String),
    /// Tool invocation chosen by the oracle
    ToolCall { tool: String, arguments: Value },
    /// Shaped tool output
    ToolResult { tool: String, output: String },
    /// Failed or rejected invocation
    ToolError { tool: String, message: String },
}

impl Turn {
    fn render(&self) -> String {
        match self {
            Turn::User(text) => format!("USER: {}", text),
            Turn::Assistant(text) => format!("ASSISTANT: {}", text),
            Turn::ToolCall { tool, arguments } => format!("TOOL_CALL: {}({})", tool, arguments),
            Turn::ToolResult { output, .. } => format!(
                "TOOL_RESULT:\n{}\n\nNow provide a natural, user-friendly response based on this data.",
                output
            ),
            Turn::ToolError { tool, message } => format!("TOOL_ERROR ({}): {}", tool, message),
        }
    }
}

/// Ordered, append-only record of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a transcript from chat history, keeping only the last `limit` messages.
    pub fn from_history(history: &[ChatMessage], limit: usize) -> Self {
        let skip = history.len().saturating_sub(limit);
        let turns = history[skip..]
            .iter()
            .map(|m| match m.role {
                Role::User => Turn::User(m.content.clone()),
                Role::Assistant => Turn::Assistant(m.content.clone()),
            })
            .collect();
        Self { turns }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent user utterance, if any.
    pub fn latest_user_request(&self) -> Option<&str> {
        self.turns.iter().rev().find_map(|t| match t {
            Turn::User(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Plain-text rendering, turns separated by blank lines.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(Turn::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
