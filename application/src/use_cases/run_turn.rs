//! Run Turn use case.
//!
//! Drives one orchestration run: the reasoning oracle repeatedly chooses
//! either a final answer or a single next tool call, tool results are folded
//! back into the transcript, and the loop stops on an answer, a repeated call,
//! or the iteration cap.

use crate::config::OrchestrationParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::reasoning_oracle::{OracleError, ReasoningOracle};
use crate::ports::tool_invoker::ToolInvoker;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use toolmux_domain::tool::generic_dump;
use toolmux_domain::{
    ChatMessage, DecisionPrompt, OracleDecision, ToolPayload, ToolReference, Transcript, Turn,
    shape_tool_result,
};
use tracing::{debug, info, warn};

/// Message returned when the oracle proposes a call already made in this run.
pub const DUPLICATE_CALL_MESSAGE: &str = "Tool already executed. Providing previous result.";

/// Message returned when the run hits the iteration cap.
pub const BUDGET_EXCEEDED_MESSAGE: &str =
    "Reached maximum iterations. Please try rephrasing your request.";

/// Errors that abort a run.
///
/// Tool failures never appear here; they are folded into the transcript.
#[derive(Error, Debug)]
pub enum RunTurnError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The oracle produced a final answer
    Answered,
    /// The oracle output could not be parsed and was returned as-is
    Unparseable,
    /// The oracle repeated an earlier call; the run stopped
    DuplicateCall,
    /// The iteration cap was reached without a final answer
    IterationBudgetExceeded,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Answered => "answered",
            RunOutcome::Unparseable => "unparseable",
            RunOutcome::DuplicateCall => "duplicate_call",
            RunOutcome::IterationBudgetExceeded => "iteration_budget_exceeded",
        }
    }
}

/// Input for the [`RunTurnUseCase`].
#[derive(Debug, Clone)]
pub struct RunTurnInput {
    /// The user's request for this run.
    pub request: String,
    /// Prior conversation, oldest first. Trimmed to `history_limit`.
    pub history: Vec<ChatMessage>,
    pub params: OrchestrationParams,
}

impl RunTurnInput {
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            history: Vec::new(),
            params: OrchestrationParams::default(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_params(mut self, params: OrchestrationParams) -> Self {
        self.params = params;
        self
    }
}

/// Result of one orchestration run.
#[derive(Debug, Clone)]
pub struct RunTurnOutput {
    /// User-facing message.
    pub message: String,
    pub outcome: RunOutcome,
    /// Oracle round-trips consumed.
    pub iterations: usize,
    /// Qualified names of the tools executed, in call order.
    pub tools_used: Vec<String>,
    pub transcript: Transcript,
}

impl RunTurnOutput {
    /// Short human summary of what the run did.
    pub fn thinking(&self) -> String {
        if self.tools_used.is_empty() {
            format!("Completed in {} step(s)", self.iterations)
        } else {
            format!(
                "Used {} tool(s): {}",
                self.tools_used.len(),
                self.tools_used.join(", ")
            )
        }
    }
}

/// Use case for running one bounded plan/act/observe loop.
///
/// Stateless across runs: every call to [`execute`](Self::execute) gets its
/// own transcript and executed-call set.
#[derive(Clone)]
pub struct RunTurnUseCase {
    oracle: Arc<dyn ReasoningOracle>,
    tools: Arc<dyn ToolInvoker>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl RunTurnUseCase {
    pub fn new(oracle: Arc<dyn ReasoningOracle>, tools: Arc<dyn ToolInvoker>) -> Self {
        Self {
            oracle,
            tools,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub async fn execute(&self, input: RunTurnInput) -> Result<RunTurnOutput, RunTurnError> {
        let params = input.params;
        let mut transcript = Transcript::from_history(&input.history, params.history_limit);
        transcript.push(Turn::User(input.request.clone()));

        let mut executed: HashSet<String> = HashSet::new();
        let mut tools_used: Vec<String> = Vec::new();

        info!(
            max_iterations = params.max_iterations,
            history = input.history.len(),
            "Starting orchestration run"
        );

        for iteration in 1..=params.max_iterations {
            let catalog = self.tools.catalog();
            let prompt = DecisionPrompt::render(&catalog, &transcript);
            let raw = self.oracle.complete(&prompt).await?;
            let decision = OracleDecision::parse(&raw);

            debug!(iteration, decision = ?decision, "Oracle decision");
            self.log_decision(iteration, &decision);

            let (tool, arguments) = match decision {
                OracleDecision::FinalAnswer(message) => {
                    return Ok(self.finish(
                        message,
                        RunOutcome::Answered,
                        iteration,
                        tools_used,
                        transcript,
                    ));
                }
                OracleDecision::Unparseable(raw) => {
                    warn!(iteration, "Oracle output not parseable, returning it verbatim");
                    return Ok(self.finish(
                        raw,
                        RunOutcome::Unparseable,
                        iteration,
                        tools_used,
                        transcript,
                    ));
                }
                OracleDecision::ToolCall { tool, arguments } => (tool, arguments),
            };

            let reference = match ToolReference::parse(&tool) {
                Ok(reference) => reference,
                Err(e) => {
                    warn!(iteration, tool = %tool, "Malformed tool reference: {}", e);
                    let message = format!(
                        "{}. Choose a tool from AVAILABLE TOOLS and name it as provider.tool_name.",
                        e
                    );
                    self.log_tool_error(&tool, &message);
                    transcript.push(Turn::ToolError { tool, message });
                    continue;
                }
            };

            let qualified = reference.to_string();
            let key = dedup_key(&qualified, &arguments);
            if !executed.insert(key) {
                info!(iteration, tool = %qualified, "Repeated tool call, stopping run");
                return Ok(self.finish(
                    DUPLICATE_CALL_MESSAGE.to_string(),
                    RunOutcome::DuplicateCall,
                    iteration,
                    tools_used,
                    transcript,
                ));
            }

            transcript.push(Turn::ToolCall {
                tool: qualified.clone(),
                arguments: arguments.clone(),
            });
            tools_used.push(qualified.clone());
            self.conversation_logger.log(ConversationEvent::new(
                ConversationEvent::TOOL_CALL,
                json!({ "iteration": iteration, "tool": qualified, "arguments": arguments }),
            ));

            let result = self
                .tools
                .call_tool(&reference.provider, &reference.tool, arguments)
                .await;

            match result {
                Ok(raw) => {
                    let payload = ToolPayload::from_raw(&raw);
                    if payload.is_error {
                        let message = generic_dump(&payload.data);
                        warn!(tool = %qualified, "Tool reported an error");
                        self.log_tool_error(&qualified, &message);
                        transcript.push(Turn::ToolError {
                            tool: qualified,
                            message,
                        });
                    } else {
                        let output =
                            shape_tool_result(&reference.provider, &reference.tool, &payload.data);
                        self.conversation_logger.log(ConversationEvent::new(
                            ConversationEvent::TOOL_RESULT,
                            json!({ "tool": qualified, "bytes": output.len() }),
                        ));
                        transcript.push(Turn::ToolResult {
                            tool: qualified,
                            output,
                        });
                    }
                }
                Err(e) => {
                    warn!(tool = %qualified, "Tool call failed: {}", e);
                    let message = e.to_string();
                    self.log_tool_error(&qualified, &message);
                    transcript.push(Turn::ToolError {
                        tool: qualified,
                        message,
                    });
                }
            }
        }

        warn!(
            max_iterations = params.max_iterations,
            "Iteration budget exhausted"
        );
        Ok(self.finish(
            BUDGET_EXCEEDED_MESSAGE.to_string(),
            RunOutcome::IterationBudgetExceeded,
            params.max_iterations,
            tools_used,
            transcript,
        ))
    }

    fn finish(
        &self,
        message: String,
        outcome: RunOutcome,
        iterations: usize,
        tools_used: Vec<String>,
        mut transcript: Transcript,
    ) -> RunTurnOutput {
        transcript.push(Turn::Assistant(message.clone()));
        self.conversation_logger.log(ConversationEvent::new(
            ConversationEvent::RUN_COMPLETE,
            json!({
                "outcome": outcome.as_str(),
                "iterations": iterations,
                "tools_used": tools_used,
            }),
        ));
        RunTurnOutput {
            message,
            outcome,
            iterations,
            tools_used,
            transcript,
        }
    }

    fn log_decision(&self, iteration: usize, decision: &OracleDecision) {
        let payload = match decision {
            OracleDecision::ToolCall { tool, .. } => {
                json!({ "iteration": iteration, "kind": "tool_call", "tool": tool })
            }
            OracleDecision::FinalAnswer(_) => json!({ "iteration": iteration, "kind": "final_answer" }),
            OracleDecision::Unparseable(_) => json!({ "iteration": iteration, "kind": "unparseable" }),
        };
        self.conversation_logger
            .log(ConversationEvent::new(ConversationEvent::ORACLE_DECISION, payload));
    }

    fn log_tool_error(&self, tool: &str, message: &str) {
        self.conversation_logger.log(ConversationEvent::new(
            ConversationEvent::TOOL_ERROR,
            json!({ "tool": tool, "message": message }),
        ));
    }
}

/// Key identifying a call within one run: qualified name plus canonical
/// (key-sorted) argument JSON.
fn dedup_key(qualified: &str, arguments: &Value) -> String {
    format!("{}:{}", qualified, arguments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::tool_invoker::InvokeError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use toolmux_domain::{ProviderTool, ToolDescriptor};

    // ==================== Test Mocks ====================

    struct ScriptedOracle {
        responses: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(String::from).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReasoningOracle for ScriptedOracle {
        async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| OracleError::RequestFailed("No more responses".to_string()))
        }
    }

    /// Oracle that proposes a fresh call every time.
    struct EndlessOracle {
        counter: Mutex<usize>,
    }

    #[async_trait]
    impl ReasoningOracle for EndlessOracle {
        async fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
            let mut n = self.counter.lock().unwrap();
            *n += 1;
            Ok(format!(
                r#"{{"action":"tool","tool":"docs.search_docs","arguments":{{"query":"q{}"}}}}"#,
                n
            ))
        }
    }

    struct MockInvoker {
        results: Mutex<VecDeque<Result<Value, InvokeError>>>,
        calls: Mutex<Vec<(String, String, Value)>>,
    }

    impl MockInvoker {
        fn new(results: Vec<Result<Value, InvokeError>>) -> Self {
            Self {
                results: Mutex::new(VecDeque::from(results)),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ToolInvoker for MockInvoker {
        fn catalog(&self) -> Vec<ProviderTool> {
            vec![ProviderTool::new(
                "docs",
                ToolDescriptor::new("search_docs", "Search documentation"),
            )]
        }

        async fn call_tool(
            &self,
            provider: &str,
            tool: &str,
            arguments: Value,
        ) -> Result<Value, InvokeError> {
            self.calls
                .lock()
                .unwrap()
                .push((provider.to_string(), tool.to_string(), arguments));
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(json!({"content": [{"type": "text", "text": "ok"}]})))
        }
    }

    struct RecordingLogger {
        events: Mutex<Vec<&'static str>>,
    }

    impl ConversationLogger for RecordingLogger {
        fn log(&self, event: ConversationEvent) {
            self.events.lock().unwrap().push(event.event_type);
        }
    }

    fn search_result() -> Value {
        json!({
            "content": [{
                "type": "text",
                "text": r#"{"results_count":1,"results":[{"title":"Install","snippet":"npm i"}]}"#
            }]
        })
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_end_to_end_docs_search() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            r#"{"action":"tool","tool":"docs.search_docs","arguments":{"query":"install"}}"#,
            r#"{"action":"response","message":"Found 1 result"}"#,
        ]));
        let invoker = Arc::new(MockInvoker::new(vec![Ok(search_result())]));
        let use_case = RunTurnUseCase::new(oracle.clone(), invoker.clone());

        let output = use_case
            .execute(RunTurnInput::new("how do I install?"))
            .await
            .unwrap();

        assert_eq!(output.message, "Found 1 result");
        assert_eq!(output.outcome, RunOutcome::Answered);
        assert_eq!(output.iterations, 2);
        assert_eq!(invoker.call_count(), 1);
        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls[0].0, "docs");
        assert_eq!(calls[0].1, "search_docs");
        assert_eq!(calls[0].2, json!({"query": "install"}));

        // Second prompt carries the shaped result
        let prompts = oracle.prompts.lock().unwrap();
        assert!(prompts[1].contains("Found 1 results:"));
        assert!(prompts[1].contains("Install"));
        assert_eq!(output.thinking(), "Used 1 tool(s): docs.search_docs");
    }

    #[tokio::test]
    async fn test_duplicate_call_stops_run() {
        let call = r#"{"action":"tool","tool":"docs.search_docs","arguments":{"query":"x","limit":5}}"#;
        let reordered =
            r#"{"action":"tool","tool":"docs.search_docs","arguments":{"limit":5,"query":"x"}}"#;
        let oracle = Arc::new(ScriptedOracle::new(vec![call, reordered]));
        let invoker = Arc::new(MockInvoker::new(vec![Ok(search_result())]));
        let use_case = RunTurnUseCase::new(oracle, invoker.clone());

        let output = use_case.execute(RunTurnInput::new("search")).await.unwrap();

        assert_eq!(output.outcome, RunOutcome::DuplicateCall);
        assert_eq!(output.message, DUPLICATE_CALL_MESSAGE);
        assert_eq!(invoker.call_count(), 1);
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        let oracle = Arc::new(EndlessOracle {
            counter: Mutex::new(0),
        });
        let invoker = Arc::new(MockInvoker::new(vec![]));
        let use_case = RunTurnUseCase::new(oracle, invoker.clone());

        let output = use_case.execute(RunTurnInput::new("loop")).await.unwrap();

        assert_eq!(output.outcome, RunOutcome::IterationBudgetExceeded);
        assert_eq!(output.message, BUDGET_EXCEEDED_MESSAGE);
        assert_eq!(output.iterations, 10);
        assert_eq!(invoker.call_count(), 10);
    }

    #[tokio::test]
    async fn test_custom_iteration_cap() {
        let oracle = Arc::new(EndlessOracle {
            counter: Mutex::new(0),
        });
        let invoker = Arc::new(MockInvoker::new(vec![]));
        let use_case = RunTurnUseCase::new(oracle, invoker.clone());

        let input = RunTurnInput::new("loop")
            .with_params(OrchestrationParams::default().with_max_iterations(3));
        let output = use_case.execute(input).await.unwrap();

        assert_eq!(output.iterations, 3);
        assert_eq!(invoker.call_count(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_output_returned_raw() {
        let oracle = Arc::new(ScriptedOracle::new(vec!["  I am not JSON at all  "]));
        let invoker = Arc::new(MockInvoker::new(vec![]));
        let use_case = RunTurnUseCase::new(oracle, invoker.clone());

        let output = use_case.execute(RunTurnInput::new("hi")).await.unwrap();

        assert_eq!(output.outcome, RunOutcome::Unparseable);
        assert_eq!(output.message, "I am not JSON at all");
        assert_eq!(invoker.call_count(), 0);
        assert_eq!(output.thinking(), "Completed in 1 step(s)");
    }

    #[tokio::test]
    async fn test_malformed_reference_consumes_iteration() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            r#"{"action":"tool","tool":"search_docs","arguments":{}}"#,
            r#"{"action":"response","message":"done"}"#,
        ]));
        let invoker = Arc::new(MockInvoker::new(vec![]));
        let use_case = RunTurnUseCase::new(oracle.clone(), invoker.clone());

        let output = use_case.execute(RunTurnInput::new("find")).await.unwrap();

        assert_eq!(output.message, "done");
        assert_eq!(output.iterations, 2);
        assert_eq!(invoker.call_count(), 0);
        assert!(
            output
                .transcript
                .turns()
                .iter()
                .any(|t| matches!(t, Turn::ToolError { tool, .. } if tool == "search_docs"))
        );
        assert!(
            oracle.prompts.lock().unwrap()[1]
                .contains("tool reference 'search_docs' must have the form provider.tool")
        );
    }

    #[tokio::test]
    async fn test_tool_failure_folded_into_transcript() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            r#"{"action":"tool","tool":"docs.search_docs","arguments":{"query":"a"}}"#,
            r#"{"action":"response","message":"sorry"}"#,
        ]));
        let invoker = Arc::new(MockInvoker::new(vec![Err(InvokeError::Timeout(30))]));
        let use_case = RunTurnUseCase::new(oracle.clone(), invoker);

        let output = use_case.execute(RunTurnInput::new("a")).await.unwrap();

        assert_eq!(output.message, "sorry");
        let prompts = oracle.prompts.lock().unwrap();
        assert!(prompts[1].contains("TOOL_ERROR (docs.search_docs): request timed out after 30s"));
    }

    #[tokio::test]
    async fn test_remote_error_payload_reaches_transcript() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            r#"{"action":"tool","tool":"github.get_pull_request","arguments":{"number":7}}"#,
            r#"{"action":"response","message":"not found"}"#,
        ]));
        let invoker = Arc::new(MockInvoker::new(vec![Err(InvokeError::Remote {
            code: -32000,
            message: "repo not found".to_string(),
            data: Some(json!({"repo": "acme/widgets"})),
        })]));
        let use_case = RunTurnUseCase::new(oracle.clone(), invoker);

        use_case.execute(RunTurnInput::new("a")).await.unwrap();

        assert!(oracle.prompts.lock().unwrap()[1].contains(
            r#"TOOL_ERROR (github.get_pull_request): provider error [-32000]: repo not found (data: {"repo":"acme/widgets"})"#
        ));
    }

    #[tokio::test]
    async fn test_is_error_payload_folded_as_error() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            r#"{"action":"tool","tool":"docs.search_docs","arguments":{}}"#,
            r#"{"action":"response","message":"failed"}"#,
        ]));
        let invoker = Arc::new(MockInvoker::new(vec![Ok(json!({
            "content": [{"type": "text", "text": "index unavailable"}],
            "isError": true
        }))]));
        let use_case = RunTurnUseCase::new(oracle.clone(), invoker);

        let output = use_case.execute(RunTurnInput::new("a")).await.unwrap();

        assert_eq!(output.outcome, RunOutcome::Answered);
        assert!(
            oracle.prompts.lock().unwrap()[1]
                .contains("TOOL_ERROR (docs.search_docs): index unavailable")
        );
    }

    #[tokio::test]
    async fn test_oracle_failure_is_fatal() {
        let oracle = Arc::new(ScriptedOracle::new(vec![]));
        let invoker = Arc::new(MockInvoker::new(vec![]));
        let use_case = RunTurnUseCase::new(oracle, invoker);

        let result = use_case.execute(RunTurnInput::new("a")).await;
        assert!(matches!(result, Err(RunTurnError::Oracle(_))));
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_prefixed() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            r#"{"action":"response","message":"ok"}"#,
        ]));
        let invoker = Arc::new(MockInvoker::new(vec![]));
        let use_case = RunTurnUseCase::new(oracle.clone(), invoker);

        let history = vec![
            ChatMessage::user("first question"),
            ChatMessage::assistant("first answer"),
            ChatMessage::user("second question"),
        ];
        let input = RunTurnInput::new("third")
            .with_history(history)
            .with_params(OrchestrationParams::default().with_history_limit(2));
        let output = use_case.execute(input).await.unwrap();

        let prompt = &oracle.prompts.lock().unwrap()[0];
        assert!(!prompt.contains("first question"));
        assert!(prompt.contains("first answer"));
        // history (2) + user + final assistant
        assert_eq!(output.transcript.len(), 4);
    }

    #[tokio::test]
    async fn test_conversation_events_logged() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            r#"{"action":"tool","tool":"docs.search_docs","arguments":{}}"#,
            r#"{"action":"response","message":"ok"}"#,
        ]));
        let invoker = Arc::new(MockInvoker::new(vec![Ok(search_result())]));
        let logger = Arc::new(RecordingLogger {
            events: Mutex::new(Vec::new()),
        });
        let use_case =
            RunTurnUseCase::new(oracle, invoker).with_conversation_logger(logger.clone());

        use_case.execute(RunTurnInput::new("a")).await.unwrap();

        let events = logger.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "oracle_decision",
                "tool_call",
                "tool_result",
                "oracle_decision",
                "run_complete"
            ]
        );
    }
}
