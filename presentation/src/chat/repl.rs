//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::path::PathBuf;
use std::sync::Arc;
use toolmux_application::{OrchestrationParams, RunTurnInput, RunTurnUseCase, ToolInvoker};
use toolmux_domain::ChatMessage;

const HISTORY_CAPACITY: usize = 1000;

/// Result of a slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandResult {
    Continue,
    Exit,
}

/// Interactive chat REPL
///
/// Keeps the last `history_limit` user/assistant messages and feeds them
/// into each new run.
pub struct ChatRepl {
    use_case: RunTurnUseCase,
    tools: Arc<dyn ToolInvoker>,
    params: OrchestrationParams,
    history: Vec<ChatMessage>,
    show_thinking: bool,
    history_file: Option<PathBuf>,
}

impl ChatRepl {
    /// Create a new ChatRepl
    pub fn new(use_case: RunTurnUseCase, tools: Arc<dyn ToolInvoker>) -> Self {
        Self {
            use_case,
            tools,
            params: OrchestrationParams::default(),
            history: Vec::new(),
            show_thinking: true,
            history_file: None,
        }
    }

    pub fn with_params(mut self, params: OrchestrationParams) -> Self {
        self.params = params;
        self
    }

    /// Set whether to print the tool-usage summary after each answer
    pub fn with_thinking(mut self, show: bool) -> Self {
        self.show_thinking = show;
        self
    }

    /// Persist line-editor history to this file
    pub fn with_history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_file = path;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut line_editor = Reedline::create();

        if let Some(path) = &self.history_file {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match FileBackedHistory::with_file(HISTORY_CAPACITY, path.clone()) {
                Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
                Err(e) => eprintln!("Warning: could not open history file: {}", e),
            }
        }

        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("toolmux".to_string()),
            DefaultPromptSegment::Empty,
        );

        self.print_welcome();

        loop {
            match line_editor.read_line(&prompt)? {
                Signal::Success(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    if line.starts_with('/') {
                        if self.handle_command(line) == CommandResult::Exit {
                            break;
                        }
                        continue;
                    }

                    self.process_request(line).await;
                }
                Signal::CtrlC => {
                    println!("^C");
                    continue;
                }
                Signal::CtrlD => {
                    println!("Bye!");
                    break;
                }
            }
        }

        Ok(())
    }

    fn print_welcome(&self) {
        let tool_count = self.tools.catalog().len();
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│              toolmux - Chat Mode            │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        println!("Tools available: {}", tool_count);
        println!();
        println!("Commands:");
        println!("  /help     - Show this help");
        println!("  /tools    - List available tools");
        println!("  /clear    - Forget the conversation so far");
        println!("  /quit     - Exit chat");
        println!();
    }

    fn handle_command(&mut self, cmd: &str) -> CommandResult {
        match cmd {
            "/quit" | "/exit" | "/q" => {
                println!("Bye!");
                CommandResult::Exit
            }
            "/help" | "/h" | "/?" => {
                println!();
                println!("Commands:");
                println!("  /help, /h, /?    - Show this help");
                println!("  /tools           - List available tools");
                println!("  /history         - Show how many messages are remembered");
                println!("  /clear           - Forget the conversation so far");
                println!("  /quit, /exit, /q - Exit chat");
                println!();
                CommandResult::Continue
            }
            "/tools" => {
                println!();
                print!("{}", ConsoleFormatter::format_tools(&self.tools.catalog()));
                println!();
                CommandResult::Continue
            }
            "/history" => {
                println!(
                    "History: {} message(s) (limit {})",
                    self.history.len(),
                    self.params.history_limit
                );
                CommandResult::Continue
            }
            "/clear" => {
                self.history.clear();
                println!("Conversation cleared.");
                CommandResult::Continue
            }
            _ => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
                CommandResult::Continue
            }
        }
    }

    async fn process_request(&mut self, request: &str) {
        println!();

        let input = RunTurnInput::new(request)
            .with_history(self.history.clone())
            .with_params(self.params);

        match self.use_case.execute(input).await {
            Ok(output) => {
                if self.show_thinking {
                    println!("{}", ConsoleFormatter::format(&output));
                } else {
                    println!("{}", ConsoleFormatter::format_answer_only(&output));
                }
                self.record_exchange(request, &output.message);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
            }
        }
    }

    fn record_exchange(&mut self, request: &str, answer: &str) {
        self.history.push(ChatMessage::user(request));
        self.history.push(ChatMessage::assistant(answer));

        let limit = self.params.history_limit;
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }
}
