//! Request correlator: matches responses to in-flight requests for one provider.
//!
//! The pending table is owned by a single actor task. Everything else talks
//! to it through a command channel:
//!
//! - [`Correlator::request`] registers a oneshot, writes the frame, and waits
//!   under a timeout. On timeout it cancels the entry; a response arriving
//!   afterwards finds nothing and is dropped.
//! - The reader task decodes stdout frames and forwards them as inbound
//!   messages. When stdout ends, every pending request is rejected with
//!   [`RpcError::TransportClosed`].
//! - Notifications go out on a broadcast channel shared by all providers.
//!
//! Because registration is queued on the same channel before the frame is
//! written, the actor always sees `Register` before the matching response.

use super::codec::{Frame, JsonLineCodec};
use super::error::RpcError;
use super::protocol::{Inbound, JsonRpcRequest, classify};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace, warn};

type Reply = oneshot::Sender<Result<Value, RpcError>>;
type Writer = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, JsonLineCodec>;

/// A provider-initiated notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub provider: String,
    pub method: String,
    pub params: Value,
}

enum Command {
    Register {
        id: u64,
        method: String,
        reply: Reply,
    },
    Cancel {
        id: u64,
    },
    Inbound(Value),
    /// Reject everything pending and refuse new registrations.
    Close,
    PendingCount(oneshot::Sender<usize>),
}

struct Pending {
    method: String,
    created: Instant,
    reply: Reply,
}

/// JSON-RPC client half for one provider.
pub struct Correlator {
    provider: String,
    commands: mpsc::UnboundedSender<Command>,
    writer: Mutex<Writer>,
    timeout: Duration,
}

impl Correlator {
    /// Start the reader and actor tasks over the given stream halves.
    ///
    /// `reader` is the provider's stdout, `writer` its stdin.
    pub fn spawn<R, W>(
        provider: impl Into<String>,
        reader: R,
        writer: W,
        timeout: Duration,
        notifications: broadcast::Sender<Notification>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let provider = provider.into();
        let (commands, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_actor(provider.clone(), rx, notifications));
        tokio::spawn(read_frames(provider.clone(), reader, commands.clone()));

        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        Self {
            provider,
            commands,
            writer: Mutex::new(FramedWrite::new(writer, JsonLineCodec::new())),
            timeout,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request and wait for its response.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, RpcError> {
        let request = JsonRpcRequest::new(method, params);
        let id = request.id;
        let (reply, rx) = oneshot::channel();

        self.commands
            .send(Command::Register {
                id,
                method: method.to_string(),
                reply,
            })
            .map_err(|_| RpcError::TransportClosed)?;

        trace!(provider = %self.provider, id, method, "Sending request");
        let written = {
            let mut writer = self.writer.lock().await;
            writer.send(&request).await
        };
        if let Err(e) = written {
            self.cancel(id);
            return Err(match e.kind() {
                io::ErrorKind::InvalidData => RpcError::Encode(e.to_string()),
                _ => {
                    debug!(provider = %self.provider, "Write failed: {}", e);
                    RpcError::TransportClosed
                }
            });
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RpcError::TransportClosed),
            Err(_) => {
                self.cancel(id);
                warn!(provider = %self.provider, id, method, "Request timed out");
                Err(RpcError::Timeout {
                    method: method.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }

    /// Reject all pending requests with [`RpcError::TransportClosed`].
    ///
    /// Later requests fail immediately.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Number of requests currently awaiting a response.
    pub async fn pending(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::PendingCount(tx)).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    fn cancel(&self, id: u64) {
        let _ = self.commands.send(Command::Cancel { id });
    }
}

/// Reader task: sole owner of the provider's stdout.
async fn read_frames<R>(provider: String, reader: R, commands: mpsc::UnboundedSender<Command>)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let mut frames = FramedRead::new(reader, JsonLineCodec::new());

    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Frame::Message(msg)) => {
                if commands.send(Command::Inbound(msg)).is_err() {
                    return;
                }
            }
            Ok(Frame::Malformed(e)) => {
                warn!(provider = %provider, "Skipping undecodable frame: {}", e);
            }
            Err(e) => {
                warn!(provider = %provider, "Read error: {}", e);
                break;
            }
        }
    }

    debug!(provider = %provider, "Reader loop ended");
    let _ = commands.send(Command::Close);
}

/// Actor task: sole owner of the pending table.
async fn run_actor(
    provider: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    notifications: broadcast::Sender<Notification>,
) {
    let mut pending: HashMap<u64, Pending> = HashMap::new();
    let mut closed = false;

    while let Some(command) = commands.recv().await {
        match command {
            Command::Register { id, method, reply } => {
                if closed {
                    let _ = reply.send(Err(RpcError::TransportClosed));
                } else {
                    pending.insert(
                        id,
                        Pending {
                            method,
                            created: Instant::now(),
                            reply,
                        },
                    );
                }
            }
            Command::Cancel { id } => {
                pending.remove(&id);
            }
            Command::Inbound(msg) => match classify(msg) {
                Inbound::Response { id, outcome } => match pending.remove(&id) {
                    Some(entry) => {
                        trace!(
                            provider = %provider,
                            id,
                            method = %entry.method,
                            elapsed_ms = entry.created.elapsed().as_millis() as u64,
                            "Response matched"
                        );
                        let _ = entry.reply.send(outcome);
                    }
                    None => {
                        debug!(provider = %provider, id, "No pending request for response (late or unknown)");
                    }
                },
                Inbound::Notification { method, params } => {
                    trace!(provider = %provider, method = %method, "Notification");
                    // No subscribers is fine
                    let _ = notifications.send(Notification {
                        provider: provider.clone(),
                        method,
                        params,
                    });
                }
                Inbound::Request { id, method } => {
                    debug!(provider = %provider, %id, method = %method, "Ignoring provider-initiated request");
                }
                Inbound::Unrecognized => {
                    debug!(provider = %provider, "Ignoring unrecognized message");
                }
            },
            Command::Close => {
                if !closed {
                    closed = true;
                    if !pending.is_empty() {
                        debug!(provider = %provider, count = pending.len(), "Rejecting pending requests");
                    }
                    for (_, entry) in pending.drain() {
                        let _ = entry.reply.send(Err(RpcError::TransportClosed));
                    }
                }
            }
            Command::PendingCount(tx) => {
                let _ = tx.send(pending.len());
            }
        }
    }
}
