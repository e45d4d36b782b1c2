//! File watch trigger: wake an agent when a file changes

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::bus::{Event, EventKind, Message, MessageBus, SENDER_FILE_WATCH};
use crate::event_log::EventSink;
use crate::trigger::{interval_from_secs, Trigger};

/// Poll interval used when none is configured
pub const DEFAULT_POLL_SECONDS: f64 = 10.0;

/// Polls a file's modification time and sends its contents when it changes
///
/// Several writes between two polls collapse into one message carrying the
/// contents as of the later poll.
pub struct FileWatchTrigger {
    agent_name: String,
    watch_path: PathBuf,
    poll: Duration,
    running: AtomicBool,
    last_modified: Mutex<Option<SystemTime>>,
}

impl FileWatchTrigger {
    /// Create a watcher with the default poll interval
    pub fn new(agent_name: impl Into<String>, watch_path: impl Into<PathBuf>) -> Self {
        Self {
            agent_name: agent_name.into(),
            watch_path: watch_path.into(),
            poll: Duration::from_secs_f64(DEFAULT_POLL_SECONDS),
            running: AtomicBool::new(false),
            last_modified: Mutex::new(None),
        }
    }

    /// Replace the poll interval
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Replace the poll interval, in (possibly fractional) seconds
    pub fn with_poll_secs(self, poll_seconds: f64) -> crate::Result<Self> {
        Ok(self.with_poll_interval(interval_from_secs(poll_seconds)?))
    }

    pub fn watch_path(&self) -> &Path {
        &self.watch_path
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll
    }

    /// Check the file once and build a message if it changed
    ///
    /// A missing or unchanged file yields `None`.
    pub async fn poll_once(&self) -> Option<Message> {
        let metadata = match tokio::fs::metadata(&self.watch_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to stat {}: {}", self.watch_path.display(), e);
                return None;
            }
        };

        let modified = match metadata.modified() {
            Ok(modified) => modified,
            Err(e) => {
                warn!(
                    "No modification time for {}: {}",
                    self.watch_path.display(),
                    e
                );
                return None;
            }
        };

        let is_newer = match *self.last_modified.lock() {
            Some(last) => modified > last,
            None => true,
        };
        if !is_newer {
            return None;
        }

        let content = match tokio::fs::read_to_string(&self.watch_path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read {}: {}", self.watch_path.display(), e);
                return None;
            }
        };
        *self.last_modified.lock() = Some(modified);

        debug!("{} changed", self.watch_path.display());
        Some(Message::new(
            SENDER_FILE_WATCH,
            &self.agent_name,
            format!(
                "File changed: {}\n\nContents:\n{}",
                self.watch_path.display(),
                content
            ),
        ))
    }
}

#[async_trait]
impl Trigger for FileWatchTrigger {
    fn kind(&self) -> &str {
        SENDER_FILE_WATCH
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }

    async fn start(&self, bus: MessageBus, events: Arc<dyn EventSink>) {
        self.running.store(true, Ordering::SeqCst);
        info!(
            "Watching {} for '{}' (every {:?})",
            self.watch_path.display(),
            self.agent_name,
            self.poll
        );

        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(self.poll).await;

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let Some(msg) = self.poll_once().await else {
                continue;
            };

            if let Err(e) = bus.send(msg) {
                error!("File watch for '{}' could not send: {}", self.agent_name, e);
                break;
            }
            events.record(
                Event::system(EventKind::TriggerFired)
                    .with_data("trigger", SENDER_FILE_WATCH)
                    .with_data("to", self.agent_name.clone())
                    .with_data("path", self.watch_path.display().to_string()),
            );
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Stopped watching {}", self.watch_path.display());
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
