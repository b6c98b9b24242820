//! Decision prompt template for the orchestration loop

use crate::tool::ProviderTool;
use crate::transcript::Transcript;

/// Builds the prompt asking the oracle for its next action.
pub struct DecisionPrompt;

impl DecisionPrompt {
    /// System instructions describing the two accepted answer shapes.
    pub fn system() -> &'static str {
        r#"You are an AI development assistant with access to external tools.

RESPONSE FORMAT:
You must respond in ONE of these JSON formats:

1. TO USE A TOOL:
{
  "action": "tool",
  "tool": "provider.toolname",
  "arguments": { "param": "value" }
}

2. TO GIVE THE FINAL ANSWER:
{
  "action": "response",
  "message": "Your natural language answer here"
}

RULES:
- Request at most one tool per answer
- When you receive TOOL_RESULT, analyze it and answer in natural, human-readable language
- Never show raw JSON to the user
- Never repeat the same tool call with the same arguments
- Use tools only when necessary
- If a TOOL_ERROR appears, recover with another approach or explain the problem"#
    }

    /// Catalog lines: `- provider.tool: description [params]`.
    pub fn tool_catalog(tools: &[ProviderTool]) -> String {
        if tools.is_empty() {
            return "(no tools available)".to_string();
        }

        tools
            .iter()
            .map(|t| {
                let mut line = format!("- {}: {}", t.qualified_name(), t.tool.description);
                if !t.tool.input_shape.is_empty() {
                    line.push_str(&format!(" [{}]", t.tool.input_shape.summary()));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full decision request for one iteration.
    pub fn render(tools: &[ProviderTool], transcript: &Transcript) -> String {
        format!(
            r#"{}

AVAILABLE TOOLS:
{}

CONVERSATION:
{}

USER'S LATEST REQUEST: {}

Respond with JSON only."#,
            Self::system(),
            Self::tool_catalog(tools),
            transcript.render(),
            transcript.latest_user_request().unwrap_or(""),
        )
    }
}
