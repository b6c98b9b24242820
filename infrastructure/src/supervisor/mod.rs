//! Process supervisor: lifecycle of tool-provider processes.
//!
//! [`ProcessSupervisor`] owns the name → provider table. Each entry moves
//! through `Starting` (spawned, handshake in flight) to `Ready` (catalog
//! cached) and is removed on explicit stop or process exit, whichever comes
//! first.
//!
//! Per provider the supervisor runs:
//!
//! - the [`Correlator`] reader and actor tasks (stdout, pending table)
//! - a stderr drain forwarding lines to `tracing`
//! - an exit watcher that deregisters the entry and rejects pending requests
//!
//! The table is a `std::sync::RwLock` held only for short map updates, never
//! across an `.await`. Each entry carries a generation number so a watcher
//! for an old instance never removes a newer one registered under the same
//! name.

mod error;
mod process;
mod registry;

pub use error::SupervisorError;
pub use registry::{ProviderCatalog, ToolRegistry};

use crate::rpc::{Correlator, Notification};
use async_trait::async_trait;
use process::{ExitReason, Lifecycle};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use toolmux_application::{InvokeError, ToolInvoker};
use toolmux_domain::{ProviderSpec, ProviderState, ProviderStatus, ProviderTool, ToolDescriptor};
use tracing::{debug, info, warn};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long `stop` waits for the child to be reaped.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Capacity of the process-wide notification channel.
const NOTIFICATION_CAPACITY: usize = 256;

const CLIENT_NAME: &str = "toolmux";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

type ProviderTable = Arc<RwLock<HashMap<String, Slot>>>;

struct Slot {
    generation: u64,
    /// Registration order
    seq: u64,
    lifecycle: Lifecycle,
    state: SlotState,
}

enum SlotState {
    Starting,
    Ready(Arc<ReadyProvider>),
}

struct ReadyProvider {
    correlator: Arc<Correlator>,
    tools: Arc<Vec<ToolDescriptor>>,
}

/// Health snapshot.
#[derive(Debug, Clone, Default)]
pub struct SupervisorStatus {
    /// Registered providers in registration order
    pub providers: Vec<ProviderStatus>,
    /// Total tools across ready providers
    pub tool_count: usize,
}

/// Supervises provider processes and multiplexes JSON-RPC calls into them.
pub struct ProcessSupervisor {
    providers: ProviderTable,
    next_generation: AtomicU64,
    notifications: broadcast::Sender<Notification>,
    request_timeout: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl ProcessSupervisor {
    pub fn new(request_timeout: Duration) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
            notifications,
            request_timeout,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Receive notifications from every provider.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Start a provider and complete its handshake.
    ///
    /// A name that is already starting or ready is a no-op. On handshake
    /// failure the child is killed and the name released.
    pub async fn start(&self, spec: ProviderSpec) -> Result<(), SupervisorError> {
        let name = spec.name.clone();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let lifecycle = Lifecycle::new();

        // Reserve the name before spawning so concurrent starts spawn once
        {
            let mut providers = self.write_table();
            if providers.contains_key(&name) {
                debug!(provider = %name, "Already registered, start is a no-op");
                return Ok(());
            }
            providers.insert(
                name.clone(),
                Slot {
                    generation,
                    seq: generation,
                    lifecycle: lifecycle.clone(),
                    state: SlotState::Starting,
                },
            );
        }

        let mut child = match process::spawn_child(&spec) {
            Ok(child) => child,
            Err(e) => {
                self.remove_if_current(&name, generation);
                lifecycle.exited.cancel();
                return Err(SupervisorError::SpawnFailed {
                    name,
                    reason: e.to_string(),
                });
            }
        };

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            self.remove_if_current(&name, generation);
            let _ = child.start_kill();
            lifecycle.exited.cancel();
            return Err(SupervisorError::SpawnFailed {
                name,
                reason: "stdio not captured".to_string(),
            });
        };
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(process::drain_stderr(name.clone(), stderr));
        }

        let correlator = Arc::new(Correlator::spawn(
            name.clone(),
            stdout,
            stdin,
            self.request_timeout,
            self.notifications.clone(),
        ));

        tokio::spawn(watch_provider(
            Arc::clone(&self.providers),
            name.clone(),
            generation,
            child,
            lifecycle.clone(),
            Arc::clone(&correlator),
        ));

        let tools = match handshake(&correlator).await {
            Ok(tools) => tools,
            Err(e) => {
                warn!(provider = %name, "Handshake failed: {}", e);
                self.remove_if_current(&name, generation);
                lifecycle.stop.cancel();
                return Err(SupervisorError::HandshakeFailure {
                    name,
                    reason: e.to_string(),
                });
            }
        };

        let tool_count = tools.len();
        let promoted = {
            let mut providers = self.write_table();
            match providers.get_mut(&name) {
                Some(slot) if slot.generation == generation => {
                    slot.state = SlotState::Ready(Arc::new(ReadyProvider {
                        correlator,
                        tools: Arc::new(tools),
                    }));
                    true
                }
                _ => false,
            }
        };

        if !promoted {
            lifecycle.stop.cancel();
            return Err(SupervisorError::HandshakeFailure {
                name,
                reason: "provider exited or was stopped during startup".to_string(),
            });
        }

        info!(provider = %name, tools = tool_count, "Started provider");
        Ok(())
    }

    /// Start every spec, returning the ones that failed.
    ///
    /// Registration order follows the order of `specs`.
    pub async fn start_all(
        &self,
        specs: impl IntoIterator<Item = ProviderSpec>,
    ) -> Vec<(String, SupervisorError)> {
        let starts = specs.into_iter().map(|spec| {
            let name = spec.name.clone();
            async move { (name, self.start(spec).await) }
        });

        futures::future::join_all(starts)
            .await
            .into_iter()
            .filter_map(|(name, result)| result.err().map(|e| (name, e)))
            .collect()
    }

    /// Stop a provider. Unknown names are a no-op.
    ///
    /// Returns whether a provider was removed.
    pub async fn stop(&self, name: &str) -> bool {
        let Some(slot) = self.write_table().remove(name) else {
            return false;
        };

        info!(provider = %name, "Stopping provider");
        if let SlotState::Ready(ready) = &slot.state {
            ready.correlator.close();
        }
        slot.lifecycle.stop.cancel();

        if tokio::time::timeout(STOP_GRACE, slot.lifecycle.exited.cancelled())
            .await
            .is_err()
        {
            warn!(provider = %name, "Provider not reaped within {:?}", STOP_GRACE);
        }
        true
    }

    /// Stop every provider.
    pub async fn stop_all(&self) {
        let names: Vec<String> = self.read_table().keys().cloned().collect();
        futures::future::join_all(names.iter().map(|name| self.stop(name))).await;
    }

    /// Aggregated catalog view over ready providers.
    pub fn registry(&self) -> ToolRegistry {
        let providers = self.read_table();
        let mut ready: Vec<(u64, ProviderCatalog)> = providers
            .iter()
            .filter_map(|(name, slot)| match &slot.state {
                SlotState::Ready(ready) => Some((
                    slot.seq,
                    ProviderCatalog {
                        provider: name.clone(),
                        tools: Arc::clone(&ready.tools),
                    },
                )),
                SlotState::Starting => None,
            })
            .collect();
        ready.sort_by_key(|(seq, _)| *seq);
        ToolRegistry::new(ready.into_iter().map(|(_, c)| c).collect())
    }

    /// Every tool across ready providers.
    pub fn list_all(&self) -> Vec<ProviderTool> {
        self.registry().list_all()
    }

    /// Health snapshot of all registered providers.
    pub fn status(&self) -> SupervisorStatus {
        let providers = self.read_table();
        let mut entries: Vec<(u64, ProviderStatus)> = providers
            .iter()
            .map(|(name, slot)| {
                let (state, tool_count) = match &slot.state {
                    SlotState::Starting => (ProviderState::Starting, 0),
                    SlotState::Ready(ready) => (ProviderState::Ready, ready.tools.len()),
                };
                (
                    slot.seq,
                    ProviderStatus {
                        name: name.clone(),
                        state,
                        tool_count,
                    },
                )
            })
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);

        let providers: Vec<ProviderStatus> = entries.into_iter().map(|(_, s)| s).collect();
        let tool_count = providers.iter().map(|p| p.tool_count).sum();
        SupervisorStatus {
            providers,
            tool_count,
        }
    }

    /// Whether `name` is registered and ready.
    pub fn is_ready(&self, name: &str) -> bool {
        matches!(
            self.read_table().get(name).map(|s| &s.state),
            Some(SlotState::Ready(_))
        )
    }

    /// Call `tool` on `provider` and return the raw result.
    ///
    /// Never spawns: an unknown, starting or stopped provider fails with
    /// [`SupervisorError::ProviderUnavailable`].
    pub async fn invoke_tool(
        &self,
        provider: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, SupervisorError> {
        let ready = self
            .ready_provider(provider)
            .ok_or_else(|| SupervisorError::ProviderUnavailable(provider.to_string()))?;

        debug!(provider, tool, "tools/call");
        ready
            .correlator
            .request(
                "tools/call",
                Some(json!({ "name": tool, "arguments": arguments })),
            )
            .await
            .map_err(|source| SupervisorError::Rpc {
                name: provider.to_string(),
                source,
            })
    }

    fn ready_provider(&self, name: &str) -> Option<Arc<ReadyProvider>> {
        match self.read_table().get(name).map(|s| &s.state) {
            Some(SlotState::Ready(ready)) => Some(Arc::clone(ready)),
            _ => None,
        }
    }

    fn remove_if_current(&self, name: &str, generation: u64) -> bool {
        remove_if_current(&self.providers, name, generation)
    }

    fn read_table(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.providers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_table(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Slot>> {
        self.providers.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        let providers = self.providers.read().unwrap_or_else(|e| e.into_inner());
        if !providers.is_empty() {
            debug!(count = providers.len(), "ProcessSupervisor dropping, killing providers");
        }
        for slot in providers.values() {
            slot.lifecycle.stop.cancel();
        }
    }
}

#[async_trait]
impl ToolInvoker for ProcessSupervisor {
    fn catalog(&self) -> Vec<ProviderTool> {
        self.list_all()
    }

    async fn call_tool(
        &self,
        provider: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, InvokeError> {
        self.invoke_tool(provider, tool, arguments)
            .await
            .map_err(InvokeError::from)
    }
}

/// `initialize` followed by `tools/list`.
async fn handshake(correlator: &Correlator) -> Result<Vec<ToolDescriptor>, crate::rpc::RpcError> {
    correlator
        .request(
            "initialize",
            Some(json!({
                "clientInfo": { "name": CLIENT_NAME, "version": CLIENT_VERSION },
                "capabilities": {},
            })),
        )
        .await?;

    let listed = correlator.request("tools/list", Some(json!({}))).await?;
    Ok(parse_tools(correlator.provider(), &listed))
}

/// Extract `tools` from a `tools/list` result, skipping invalid entries.
fn parse_tools(provider: &str, listed: &Value) -> Vec<ToolDescriptor> {
    let Some(entries) = listed.get("tools").and_then(|t| t.as_array()) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(
            |entry| match serde_json::from_value::<ToolDescriptor>(entry.clone()) {
                Ok(tool) => Some(tool),
                Err(e) => {
                    warn!(provider, "Skipping invalid tool definition: {}", e);
                    None
                }
            },
        )
        .collect()
}

fn remove_if_current(providers: &ProviderTable, name: &str, generation: u64) -> bool {
    let mut table = providers.write().unwrap_or_else(|e| e.into_inner());
    match table.get(name) {
        Some(slot) if slot.generation == generation => {
            table.remove(name);
            true
        }
        _ => false,
    }
}

/// Exit watcher: deregisters the provider and rejects its pending requests.
async fn watch_provider(
    providers: ProviderTable,
    name: String,
    generation: u64,
    child: tokio::process::Child,
    lifecycle: Lifecycle,
    correlator: Arc<Correlator>,
) {
    let reason = process::watch_exit(child, &lifecycle).await;
    correlator.close();
    let removed = remove_if_current(&providers, &name, generation);

    match reason {
        ExitReason::Exited(status) if removed => {
            warn!(provider = %name, status = %status, "Provider exited, deregistered");
        }
        ExitReason::Exited(status) => {
            debug!(provider = %name, status = %status, "Provider exited");
        }
        ExitReason::Stopped => {
            debug!(provider = %name, "Provider stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tools() {
        let listed = json!({
            "tools": [
                {
                    "name": "search_docs",
                    "description": "Search documentation",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"query": {"type": "string"}},
                        "required": ["query"]
                    }
                },
                {"description": "no name"},
                {"name": "list_channels"}
            ]
        });
        let tools = parse_tools("docs", &listed);
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "search_docs");
        assert!(tools[0].input_shape.get("query").unwrap().required);
        assert_eq!(tools[1].name, "list_channels");
    }

    #[test]
    fn test_parse_tools_missing() {
        assert!(parse_tools("x", &json!({})).is_empty());
        assert!(parse_tools("x", &Value::Null).is_empty());
    }

    #[tokio::test]
    async fn test_call_unknown_provider_is_unavailable() {
        let supervisor = ProcessSupervisor::default();
        let err = supervisor
            .invoke_tool("ghost", "anything", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::ProviderUnavailable(ref n) if n == "ghost"));
        assert!(supervisor.status().providers.is_empty());
    }

    #[tokio::test]
    async fn test_stop_unknown_is_noop() {
        let supervisor = ProcessSupervisor::default();
        assert!(!supervisor.stop("ghost").await);
    }

    #[tokio::test]
    async fn test_spawn_failure_releases_name() {
        let supervisor = ProcessSupervisor::default();
        let spec = ProviderSpec::new("broken", "/nonexistent/toolmux-provider-binary");
        let err = supervisor.start(spec).await.unwrap_err();
        assert!(matches!(err, SupervisorError::SpawnFailed { .. }));
        assert!(supervisor.status().providers.is_empty());
    }

    /// Integration tests against a tiny shell-script provider.
    #[cfg(unix)]
    mod process_tests {
        use super::*;
        use std::io::Write;
        use tempfile::NamedTempFile;

        /// Answers `initialize`, `tools/list` with one tool, and `tools/call`
        /// by echoing the tool name. `slow` never answers; `exit` exits.
        /// Appends one line to `$SPAWN_LOG` per launch when set.
        const PROVIDER_SCRIPT: &str = r#"
if [ -n "${SPAWN_LOG:-}" ]; then echo spawned >> "$SPAWN_LOG"; fi
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p')
  case "$line" in
    *'"initialize"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"serverInfo":{"name":"sh"}}}\n' "$id" ;;
    *'"tools/list"'*)
      echo "starting catalog" >&2
      printf '{"jsonrpc":"2.0","method":"notifications/ready"}\n'
      printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"echo","description":"Echo","inputSchema":{"type":"object","properties":{"text":{"type":"string"}}}}]}}\n' "$id" ;;
    *'"name":"slow"'*)
      : ;;
    *'"name":"exit"'*)
      exit 0 ;;
    *'"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":%s,"result":{"content":[{"type":"text","text":"echoed"}]}}\n' "$id" ;;
  esac
done
"#;

        fn script() -> NamedTempFile {
            let mut file = NamedTempFile::new().unwrap();
            file.write_all(PROVIDER_SCRIPT.as_bytes()).unwrap();
            file.flush().unwrap();
            file
        }

        fn spec(name: &str, script: &NamedTempFile) -> ProviderSpec {
            ProviderSpec::new(name, "sh").with_args([script.path().to_string_lossy().to_string()])
        }

        async fn wait_until_gone(supervisor: &ProcessSupervisor, name: &str) {
            for _ in 0..100 {
                if !supervisor.status().providers.iter().any(|p| p.name == name) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("provider {} still registered", name);
        }

        #[tokio::test]
        async fn test_start_and_call() {
            let script = script();
            let supervisor = ProcessSupervisor::new(Duration::from_secs(5));
            let mut notifications = supervisor.subscribe();

            supervisor.start(spec("echo", &script)).await.unwrap();

            assert!(supervisor.is_ready("echo"));
            let tools = supervisor.list_all();
            assert_eq!(tools.len(), 1);
            assert_eq!(tools[0].qualified_name(), "echo.echo");

            let note = notifications.recv().await.unwrap();
            assert_eq!(note.provider, "echo");
            assert_eq!(note.method, "notifications/ready");

            let result = supervisor
                .invoke_tool("echo", "echo", json!({"text": "hi"}))
                .await
                .unwrap();
            assert_eq!(result["content"][0]["text"], "echoed");

            supervisor.stop_all().await;
            assert!(supervisor.status().providers.is_empty());
        }

        #[tokio::test]
        async fn test_start_is_idempotent() {
            let script = script();
            let spawn_log = NamedTempFile::new().unwrap();
            let supervisor = ProcessSupervisor::new(Duration::from_secs(5));
            let docs = || {
                spec("docs", &script)
                    .with_env("SPAWN_LOG", spawn_log.path().to_string_lossy().to_string())
            };

            let (a, b) = tokio::join!(supervisor.start(docs()), supervisor.start(docs()));
            a.unwrap();
            b.unwrap();
            supervisor.start(docs()).await.unwrap();

            let status = supervisor.status();
            assert_eq!(status.providers.len(), 1);
            assert_eq!(status.tool_count, 1);

            let spawns = std::fs::read_to_string(spawn_log.path()).unwrap();
            assert_eq!(spawns.lines().count(), 1);
            supervisor.stop_all().await;
        }

        #[tokio::test]
        async fn test_registration_order() {
            let script = script();
            let supervisor = ProcessSupervisor::new(Duration::from_secs(5));

            let failures = supervisor
                .start_all(vec![
                    spec("zeta", &script),
                    ProviderSpec::new("broken", "/nonexistent/toolmux-provider-binary"),
                    spec("alpha", &script),
                ])
                .await;
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "broken");

            let names: Vec<String> = supervisor
                .status()
                .providers
                .into_iter()
                .map(|p| p.name)
                .collect();
            assert_eq!(names, vec!["zeta", "alpha"]);
            supervisor.stop_all().await;
        }

        #[tokio::test]
        async fn test_stop_rejects_pending_and_deregisters() {
            let script = script();
            let supervisor = Arc::new(ProcessSupervisor::new(Duration::from_secs(30)));
            supervisor.start(spec("slowpoke", &script)).await.unwrap();

            let call = {
                let supervisor = Arc::clone(&supervisor);
                tokio::spawn(async move { supervisor.invoke_tool("slowpoke", "slow", json!({})).await })
            };
            tokio::time::sleep(Duration::from_millis(50)).await;

            assert!(supervisor.stop("slowpoke").await);
            let err = call.await.unwrap().unwrap_err();
            assert!(matches!(
                err,
                SupervisorError::Rpc {
                    source: crate::rpc::RpcError::TransportClosed,
                    ..
                }
            ));
            assert!(supervisor.list_all().is_empty());

            let err = supervisor
                .invoke_tool("slowpoke", "echo", json!({}))
                .await
                .unwrap_err();
            assert!(matches!(err, SupervisorError::ProviderUnavailable(_)));
        }

        #[tokio::test]
        async fn test_unexpected_exit_deregisters() {
            let script = script();
            let supervisor = ProcessSupervisor::new(Duration::from_secs(30));
            supervisor.start(spec("fragile", &script)).await.unwrap();

            let err = supervisor
                .invoke_tool("fragile", "exit", json!({}))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                SupervisorError::Rpc {
                    source: crate::rpc::RpcError::TransportClosed,
                    ..
                }
            ));

            wait_until_gone(&supervisor, "fragile").await;
            assert!(supervisor.list_all().is_empty());
        }

        #[tokio::test]
        async fn test_handshake_failure_is_not_registered() {
            let supervisor = ProcessSupervisor::new(Duration::from_secs(5));
            // Exits immediately without answering
            let spec = ProviderSpec::new("mute", "sh").with_args(["-c", "exit 0"]);
            let err = supervisor.start(spec).await.unwrap_err();
            assert!(matches!(err, SupervisorError::HandshakeFailure { .. }));
            assert!(supervisor.status().providers.is_empty());
        }

        #[tokio::test]
        async fn test_env_overlay_reaches_child() {
            let supervisor = ProcessSupervisor::new(Duration::from_secs(5));
            let body = r#"read -r line; id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p'); printf '{"jsonrpc":"2.0","id":%s,"result":{}}\n' "$id"; read -r line; id=$(printf '%s' "$line" | sed -n 's/.*"id":\([0-9]*\).*/\1/p'); printf '{"jsonrpc":"2.0","id":%s,"result":{"tools":[{"name":"%s"}]}}\n' "$id" "$TOOL_NAME"; cat >/dev/null"#;
            let spec = ProviderSpec::new("envy", "sh")
                .with_args(["-c", body])
                .with_env("TOOL_NAME", "from_env");

            supervisor.start(spec).await.unwrap();
            let tools = supervisor.list_all();
            assert_eq!(tools[0].tool.name, "from_env");
            supervisor.stop_all().await;
        }
    }
}
