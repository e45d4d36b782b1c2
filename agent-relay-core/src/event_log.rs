//! Append-only event log
//!
//! Every event is kept in memory, echoed through `tracing` for live
//! monitoring, and optionally appended to a JSONL file that can be read back
//! with cat, grep and jq.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::bus::{Event, EventKind};
use crate::config::EventLogConfig;
use crate::utils::{expand_tilde, truncate_chars};

/// Longest rendered value in an echoed event line
const ECHO_VALUE_LIMIT: usize = 80;

/// Write-only destination for events
pub trait EventSink: Send + Sync {
    /// Record one event
    fn record(&self, event: Event);
}

/// Append-only JSONL event log
pub struct EventLog {
    path: Option<PathBuf>,
    /// Opened once; `None` when there is no path or it couldn't be opened
    file: Option<Mutex<LineWriter<File>>>,
    echo: bool,
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    /// Create an event log, appending to `path` when given
    ///
    /// A file that can't be opened is reported once and the log carries on
    /// in memory.
    pub fn new(path: Option<PathBuf>) -> Self {
        let file = path.as_deref().and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(Mutex::new(LineWriter::new(file))),
                Err(e) => {
                    warn!("Event log {} not writable: {}", path.display(), e);
                    None
                }
            }
        });

        Self {
            path,
            file,
            echo: true,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Create an event log that only keeps events in memory
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Build from configuration
    pub fn from_config(config: &EventLogConfig) -> Self {
        Self::new(config.path.as_deref().map(expand_tilde)).with_echo(config.echo)
    }

    /// Enable or disable the live echo
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Path of the JSONL file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Snapshot of the events of one kind
    pub fn events_of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of events recorded
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    fn append_line(file: &Mutex<LineWriter<File>>, event: &Event) -> std::io::Result<()> {
        let line = serde_json::json!({
            "ts": event.timestamp.to_rfc3339(),
            "kind": event.kind,
            "agent": event.agent,
            "data": event.data,
        });
        writeln!(file.lock(), "{}", line)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl EventSink for EventLog {
    fn record(&self, event: Event) {
        if self.echo {
            info!(target: "agent_relay::events", "{}", format_event(&event));
        }

        if let (Some(file), Some(path)) = (&self.file, &self.path) {
            if let Err(e) = Self::append_line(file, &event) {
                warn!("Failed to append event to {}: {}", path.display(), e);
            }
        }

        self.events.lock().push(event);
    }
}

/// Render an event as a single human-readable line
pub fn format_event(event: &Event) -> String {
    let ts = event.timestamp.format("%H:%M:%S%.3f");
    format!(
        "[{}] {:20} | {:12} | {}",
        ts,
        event.kind.as_str(),
        event.agent,
        format_data(&event.data)
    )
}

fn format_data(data: &BTreeMap<String, serde_json::Value>) -> String {
    data.iter()
        .map(|(key, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", key, truncate_chars(&rendered, ECHO_VALUE_LIMIT))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
