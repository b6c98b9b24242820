//! JSONL file sink for orchestration events.
//!
//! Each [`ConversationEvent`] becomes one JSON line carrying `type`,
//! `timestamp`, `session` and a per-session `seq`, merged with the event
//! payload. The file is opened in append mode so successive sessions share
//! one log.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use toolmux_application::{ConversationEvent, ConversationLogger};
use tracing::warn;

struct Sink {
    writer: BufWriter<File>,
    seq: u64,
}

/// Append-only JSONL conversation logger.
///
/// Thread-safe via `Mutex`. Flushes after every record and on `Drop`.
pub struct JsonlConversationLogger {
    sink: Mutex<Sink>,
    session: String,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open (or create) the log at `path`, creating parent directories.
    ///
    /// Returns `None` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create conversation log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open conversation log {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            sink: Mutex::new(Sink {
                writer: BufWriter::new(file),
                seq: 0,
            }),
            session: chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string(),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Identifier shared by every record written through this logger.
    pub fn session(&self) -> &str {
        &self.session
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let Ok(mut sink) = self.sink.lock() else {
            return;
        };
        sink.seq += 1;

        let mut record = match event.payload {
            serde_json::Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        record.insert("type".to_string(), event.event_type.into());
        record.insert("timestamp".to_string(), timestamp.into());
        record.insert("session".to_string(), self.session.clone().into());
        record.insert("seq".to_string(), sink.seq.into());

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };
        let _ = writeln!(sink.writer, "{}", line);
        let _ = sink.writer.flush();
    }
}

impl Drop for JsonlConversationLogger {
    fn drop(&mut self) {
        if let Ok(mut sink) = self.sink.lock() {
            let _ = sink.writer.flush();
        }
    }
}
