//! Console output formatter for tools, health and run results

use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use serde_json::{Value, json};
use toolmux_application::{RunOutcome, RunTurnOutput};
use toolmux_domain::{ProviderState, ProviderStatus, ProviderTool};

/// Formats command results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the answer with a dimmed summary of the tools used
    pub fn format(output: &RunTurnOutput) -> String {
        let mut text = Self::format_answer_only(output);

        let summary = format!("({})", output.thinking());
        text.push_str(&format!("\n{}\n", summary.dimmed()));

        if output.outcome != RunOutcome::Answered {
            text.push_str(&format!(
                "{} {}\n",
                "Run ended:".yellow().bold(),
                output.outcome.as_str()
            ));
        }

        text
    }

    /// Format as JSON
    pub fn format_json(output: &RunTurnOutput) -> String {
        let value = json!({
            "message": output.message,
            "outcome": output.outcome.as_str(),
            "iterations": output.iterations,
            "tools_used": output.tools_used,
            "thinking": output.thinking(),
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the answer only (concise output)
    pub fn format_answer_only(output: &RunTurnOutput) -> String {
        format!("{}\n", output.message)
    }

    /// Format the tool catalog, grouped by provider
    pub fn format_tools(tools: &[ProviderTool]) -> String {
        if tools.is_empty() {
            return format!("{}\n", "No tools available.".yellow());
        }

        let mut output = String::new();
        output.push_str(&Self::header("Available Tools"));
        output.push('\n');

        let mut current_provider: Option<&str> = None;
        for tool in tools {
            if current_provider != Some(tool.provider.as_str()) {
                output.push_str(&Self::section_header(&tool.provider));
                current_provider = Some(tool.provider.as_str());
            }

            output.push_str(&format!("  {}\n", tool.qualified_name().green().bold()));
            if !tool.tool.description.is_empty() {
                output.push_str(&Self::indent(&tool.tool.description, "      "));
                output.push('\n');
            }
            if !tool.tool.input_shape.is_empty() {
                output.push_str(&format!(
                    "      {} {}\n",
                    "args:".dimmed(),
                    tool.tool.input_shape.summary()
                ));
            }
        }

        output.push_str(&format!(
            "\n{} {}\n",
            "Total:".cyan().bold(),
            tools.len()
        ));
        output
    }

    /// Format the tool catalog as JSON
    pub fn format_tools_json(tools: &[ProviderTool]) -> String {
        serde_json::to_string_pretty(tools).unwrap_or_else(|_| "[]".to_string())
    }

    /// Format provider health
    pub fn format_health(providers: &[ProviderStatus], tool_count: usize) -> String {
        let mut output = String::new();
        output.push_str(&Self::header("Provider Health"));
        output.push('\n');

        if providers.is_empty() {
            output.push_str(&format!("\n{}\n", "No providers running.".yellow()));
        }

        for provider in providers {
            let state = match provider.state {
                ProviderState::Ready => provider.state.as_str().green(),
                ProviderState::Starting => provider.state.as_str().yellow(),
                ProviderState::Stopped => provider.state.as_str().red(),
            };
            output.push_str(&format!(
                "  {:<20} {:<10} {} tool(s)\n",
                provider.name, state, provider.tool_count
            ));
        }

        let ready = providers.iter().filter(|p| p.state.is_ready()).count();
        output.push_str(&format!(
            "\n{} {} ready, {} tool(s)\n",
            "Status:".cyan().bold(),
            ready,
            tool_count
        ));
        output
    }

    /// Format provider health as JSON
    pub fn format_health_json(providers: &[ProviderStatus], tool_count: usize) -> String {
        let running: Vec<&str> = providers
            .iter()
            .filter(|p| p.state.is_ready())
            .map(|p| p.name.as_str())
            .collect();
        let value = json!({
            "status": "ok",
            "providers": providers,
            "running": running,
            "tool_count": tool_count,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the raw result of a direct tool call
    pub fn format_call_result(result: &Value) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, output: &RunTurnOutput) -> String {
        Self::format(output)
    }

    fn format_json(&self, output: &RunTurnOutput) -> String {
        Self::format_json(output)
    }

    fn format_answer_only(&self, output: &RunTurnOutput) -> String {
        Self::format_answer_only(output)
    }
}
