//! Proactive triggers
//!
//! A trigger is a background producer that synthesizes inbound messages on a
//! schedule or when something outside the process changes. A proactive agent
//! is just an agent that receives messages from a trigger instead of a human.

pub mod file_watch;
pub mod timer;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::bus::MessageBus;
use crate::event_log::EventSink;

pub use file_watch::{FileWatchTrigger, DEFAULT_POLL_SECONDS};
pub use timer::{TimerTrigger, DEFAULT_TIMER_PROMPT};

/// Longest timer or poll interval accepted, one week
pub const MAX_INTERVAL_SECONDS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

/// Convert a configured interval in seconds to a [`Duration`]
///
/// Zero, negative, non-finite and over-long values are rejected.
pub fn interval_from_secs(seconds: f64) -> crate::Result<Duration> {
    if !(seconds > 0.0 && seconds <= MAX_INTERVAL_SECONDS) {
        return Err(crate::Error::Validation(format!(
            "interval must be > 0 and at most {} seconds, got {}",
            MAX_INTERVAL_SECONDS, seconds
        )));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| crate::Error::Validation(format!("interval {}: {}", seconds, e)))
}

/// A background producer of inbound messages
#[async_trait]
pub trait Trigger: Send + Sync {
    /// Producer kind, used as the message sender ("timer", "file_watch")
    fn kind(&self) -> &str;

    /// Agent the trigger wakes up
    fn agent_name(&self) -> &str;

    /// Run until [`Trigger::stop`] takes effect
    ///
    /// The running flag is checked before every send, so a stop issued
    /// mid-sleep lets the sleep finish without producing a message.
    async fn start(&self, bus: MessageBus, events: Arc<dyn EventSink>);

    /// Ask the trigger to stop at its next cycle boundary
    fn stop(&self);

    /// Whether the trigger loop is active
    fn is_running(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_secs() {
        assert_eq!(interval_from_secs(0.25).unwrap(), Duration::from_millis(250));
        assert_eq!(
            interval_from_secs(MAX_INTERVAL_SECONDS).unwrap(),
            Duration::from_secs(604_800)
        );
    }

    #[test]
    fn test_interval_from_secs_rejects_unusable_values() {
        for seconds in [0.0, -1.0, 1e20, f64::INFINITY, f64::NAN] {
            let err = interval_from_secs(seconds).unwrap_err();
            assert!(
                err.to_string().contains("interval must be > 0"),
                "{seconds}: {err}"
            );
        }
    }
}
