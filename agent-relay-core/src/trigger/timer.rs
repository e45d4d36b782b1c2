//! Timer trigger: wake an agent at a fixed interval

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::bus::{Event, EventKind, Message, MessageBus, SENDER_TIMER};
use crate::event_log::EventSink;
use crate::trigger::{interval_from_secs, Trigger};

/// Prompt sent when none is configured
pub const DEFAULT_TIMER_PROMPT: &str = "Check if there is anything that needs your attention.";

/// Periodically sends a fixed prompt to an agent
pub struct TimerTrigger {
    agent_name: String,
    interval: Duration,
    prompt: String,
    running: AtomicBool,
}

impl TimerTrigger {
    /// Create a timer with the default prompt
    pub fn new(agent_name: impl Into<String>, interval: Duration) -> Self {
        Self {
            agent_name: agent_name.into(),
            interval,
            prompt: DEFAULT_TIMER_PROMPT.to_string(),
            running: AtomicBool::new(false),
        }
    }

    /// Create a timer from an interval in (possibly fractional) seconds
    pub fn every_secs(
        agent_name: impl Into<String>,
        interval_seconds: f64,
    ) -> crate::Result<Self> {
        Ok(Self::new(agent_name, interval_from_secs(interval_seconds)?))
    }

    /// Replace the prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

#[async_trait]
impl Trigger for TimerTrigger {
    fn kind(&self) -> &str {
        SENDER_TIMER
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }

    async fn start(&self, bus: MessageBus, events: Arc<dyn EventSink>) {
        self.running.store(true, Ordering::SeqCst);
        info!(
            "Timer for '{}' started (every {:?})",
            self.agent_name, self.interval
        );

        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(self.interval).await;

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            debug!("Timer firing for '{}'", self.agent_name);
            let msg = Message::new(SENDER_TIMER, &self.agent_name, &self.prompt);
            if let Err(e) = bus.send(msg) {
                error!("Timer for '{}' could not send: {}", self.agent_name, e);
                break;
            }
            events.record(
                Event::system(EventKind::TriggerFired)
                    .with_data("trigger", SENDER_TIMER)
                    .with_data("to", self.agent_name.clone()),
            );
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Timer for '{}' stopped", self.agent_name);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::EventLog;

    async fn drain(bus: &MessageBus) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(Ok(msg)) = tokio::time::timeout(Duration::from_millis(5), bus.receive()).await {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_timer_defaults() {
        let timer = TimerTrigger::every_secs("assistant", 30.0).unwrap();
        assert_eq!(timer.interval(), Duration::from_secs(30));
        assert_eq!(timer.prompt(), DEFAULT_TIMER_PROMPT);
        assert_eq!(timer.kind(), "timer");
        assert_eq!(timer.agent_name(), "assistant");
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_until_stopped() {
        let bus = MessageBus::new();
        let log = Arc::new(EventLog::in_memory().with_echo(false));
        let timer = Arc::new(
            TimerTrigger::every_secs("assistant", 0.01)
                .unwrap()
                .with_prompt("Check email."),
        );

        let task = {
            let timer = Arc::clone(&timer);
            let bus = bus.clone();
            let events: Arc<dyn EventSink> = log.clone();
            tokio::spawn(async move { timer.start(bus, events).await })
        };

        // Fires at 10, 20, 30 and 40 ms.
        tokio::time::sleep(Duration::from_millis(45)).await;
        timer.stop();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("timer task should finish after stop")
            .unwrap();
        assert!(!timer.is_running());

        let fired = drain(&bus).await;
        assert_eq!(fired.len(), 4);
        for msg in &fired {
            assert_eq!(msg.sender, "timer");
            assert_eq!(msg.to, "assistant");
            assert_eq!(msg.content, "Check email.");
        }
        assert_eq!(log.events_of_kind(EventKind::TriggerFired).len(), 4);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let late = drain(&bus).await;
        assert!(late.is_empty());
    }

    #[test]
    fn test_every_secs_rejects_unusable_interval() {
        assert!(TimerTrigger::every_secs("assistant", 1e20).is_err());
        assert!(TimerTrigger::every_secs("assistant", f64::INFINITY).is_err());
        assert!(TimerTrigger::every_secs("assistant", 0.0).is_err());
    }

    #[tokio::test]
    async fn test_stop_during_sleep_sends_nothing() {
        let bus = MessageBus::new();
        let log: Arc<dyn EventSink> = Arc::new(EventLog::in_memory().with_echo(false));
        let timer = Arc::new(TimerTrigger::new("assistant", Duration::from_millis(50)));

        let task = {
            let timer = Arc::clone(&timer);
            let bus = bus.clone();
            tokio::spawn(async move { timer.start(bus, log).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(timer.is_running());
        timer.stop();
        task.await.unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(10), bus.receive()).await;
        assert!(pending.is_err());
    }
}
