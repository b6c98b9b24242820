//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored output
    Text,
    /// JSON output
    Json,
}

/// CLI arguments for toolmux
#[derive(Parser, Debug)]
#[command(name = "toolmux")]
#[command(author, version, about = "Control plane for MCP tool providers driven by an LLM")]
#[command(long_about = r#"
toolmux launches tool providers as child processes, speaks JSON-RPC to them
over stdio, and lets an LLM pick which tool to call to answer a request.

Each request runs a bounded loop:
1. The LLM sees the conversation and the available tools
2. It either answers or asks for one tool call
3. The tool result is added to the conversation and the loop repeats

Configuration files are loaded from (in priority order):
1. TOOLMUX_* environment variables (e.g. TOOLMUX_ORCHESTRATION__MAX_ITERATIONS)
2. --config <path>     Explicit config file
3. ./toolmux.toml      Project-level config
4. ~/.config/toolmux/config.toml   Global config

Example:
  toolmux tools
  toolmux call docs search_docs '{"query":"onboarding"}'
  toolmux ask "Find the onboarding docs"
  toolmux chat
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Hide the tool-usage summary after each answer
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Append conversation events as JSON lines to this file
    #[arg(long, value_name = "PATH", global = true)]
    pub log_conversation: Option<PathBuf>,

    /// Override the maximum oracle round-trips per request
    #[arg(long, value_name = "N", global = true)]
    pub max_iterations: Option<usize>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every tool exposed by the running providers
    Tools,

    /// Call one tool directly, bypassing the LLM
    Call {
        /// Provider name
        provider: String,
        /// Tool name within the provider
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(value_name = "JSON")]
        arguments: Option<String>,
    },

    /// Answer one request and exit
    Ask {
        /// The request to answer
        request: String,
    },

    /// Start an interactive chat session
    Chat,

    /// Show provider health
    Health,
}

impl Cli {
    /// The subcommand to run; a bare invocation opens the chat.
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_call() {
        let cli = Cli::parse_from([
            "toolmux",
            "call",
            "docs",
            "search_docs",
            r#"{"query":"onboarding"}"#,
        ]);
        assert_eq!(
            cli.subcommand(),
            Command::Call {
                provider: "docs".to_string(),
                tool: "search_docs".to_string(),
                arguments: Some(r#"{"query":"onboarding"}"#.to_string()),
            }
        );
    }

    #[test]
    fn test_parse_ask_with_global_flags() {
        let cli = Cli::parse_from([
            "toolmux",
            "ask",
            "Find the docs",
            "-vv",
            "--output",
            "json",
            "--log-conversation",
            "/tmp/run.jsonl",
        ]);
        assert_eq!(
            cli.subcommand(),
            Command::Ask {
                request: "Find the docs".to_string()
            }
        );
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_conversation, Some(PathBuf::from("/tmp/run.jsonl")));
    }

    #[test]
    fn test_bare_invocation_is_chat() {
        let cli = Cli::parse_from(["toolmux"]);
        assert_eq!(cli.subcommand(), Command::Chat);
        assert_eq!(cli.output, OutputFormat::Text);
        assert!(!cli.show_config);
    }
}
