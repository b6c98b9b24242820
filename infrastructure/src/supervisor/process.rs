//! Child process plumbing: spawn, stderr drain, exit watcher.

use futures::StreamExt;
use std::process::Stdio;
use tokio::process::{Child, ChildStderr, Command};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;
use toolmux_domain::ProviderSpec;
use tracing::debug;

/// Cancellation signals shared between the supervisor and a provider's
/// exit watcher.
#[derive(Debug, Clone, Default)]
pub(crate) struct Lifecycle {
    /// Cancelled to request termination.
    pub stop: CancellationToken,
    /// Cancelled by the watcher once the child is gone.
    pub exited: CancellationToken,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Spawn a provider with piped stdio.
///
/// The child inherits our environment with the spec's `env` layered on top.
pub(crate) fn spawn_child(spec: &ProviderSpec) -> std::io::Result<Child> {
    debug!(provider = %spec.name, command = %spec.command, args = ?spec.args, "Spawning provider");

    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    // Linux: request kernel to send SIGTERM to child when parent dies.
    // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
    #[cfg(target_os = "linux")]
    unsafe {
        cmd.pre_exec(|| {
            libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
            Ok(())
        });
    }

    cmd.spawn()
}

/// Forward each stderr line to `tracing` at debug level until EOF.
pub(crate) async fn drain_stderr(provider: String, stderr: ChildStderr) {
    let mut lines = FramedRead::new(stderr, LinesCodec::new());
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => debug!(provider = %provider, "stderr: {}", line.trim_end()),
            Err(e) => {
                debug!(provider = %provider, "stderr read error: {}", e);
                break;
            }
        }
    }
}

/// How a watched child went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ExitReason {
    /// Termination was requested through [`Lifecycle::stop`].
    Stopped,
    /// The process ended on its own.
    Exited(String),
}

/// Wait for the child to exit or for a stop request, whichever comes first.
///
/// On a stop request the child is killed and reaped. `lifecycle.exited` is
/// cancelled before returning.
pub(crate) async fn watch_exit(mut child: Child, lifecycle: &Lifecycle) -> ExitReason {
    let reason = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => ExitReason::Exited(status.to_string()),
            Err(e) => ExitReason::Exited(format!("wait failed: {}", e)),
        },
        _ = lifecycle.stop.cancelled() => {
            if let Err(e) = child.kill().await {
                debug!("kill failed: {}", e);
            }
            ExitReason::Stopped
        }
    };
    lifecycle.exited.cancel();
    reason
}
