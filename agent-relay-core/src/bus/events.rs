//! Message and event types carried by the bus

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sender name used for messages typed by a human caller
pub const SENDER_USER: &str = "user";
/// Sender name used by timer triggers
pub const SENDER_TIMER: &str = "timer";
/// Sender name used by file watch triggers
pub const SENDER_FILE_WATCH: &str = "file_watch";
/// Sender name used for orchestrator-authored messages
pub const SENDER_SYSTEM: &str = "system";

/// Producer names that can never be registered as agents
pub const RESERVED_SENDERS: [&str; 4] = [SENDER_USER, SENDER_TIMER, SENDER_FILE_WATCH, SENDER_SYSTEM];

/// Check whether a name is reserved for a non-agent producer
pub fn is_reserved_sender(name: &str) -> bool {
    RESERVED_SENDERS.contains(&name)
}

/// The unit of communication between agents and the outside world
///
/// Messages are never mutated after construction. Routing looks only at
/// `to`, and replies are addressed back to `sender`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message (agent name or a reserved producer)
    pub sender: String,
    /// Who the message is for (agent name or "user")
    pub to: String,
    /// Text payload
    pub content: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message stamped with the current time
    pub fn new(
        sender: impl Into<String>,
        to: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            to: to.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create a message from the human caller
    pub fn from_user(to: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(SENDER_USER, to, content)
    }

    /// Create an orchestrator-authored message
    pub fn system(to: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(SENDER_SYSTEM, to, content)
    }
}

/// Kinds of observable steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MessageRouted,
    LoopStart,
    LlmCall,
    LlmResponse,
    ToolCall,
    ToolResult,
    LoopEnd,
    LoopMaxIterations,
    TriggerFired,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MessageRouted => "message_routed",
            EventKind::LoopStart => "loop_start",
            EventKind::LlmCall => "llm_call",
            EventKind::LlmResponse => "llm_response",
            EventKind::ToolCall => "tool_call",
            EventKind::ToolResult => "tool_result",
            EventKind::LoopEnd => "loop_end",
            EventKind::LoopMaxIterations => "loop_max_iterations",
            EventKind::TriggerFired => "trigger_fired",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record of something that happened
///
/// `agent` is empty for system-level events such as routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub agent: String,
    pub data: BTreeMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a new event with no data
    pub fn new(kind: EventKind, agent: impl Into<String>) -> Self {
        Self {
            kind,
            agent: agent.into(),
            data: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a system-level event
    pub fn system(kind: EventKind) -> Self {
        Self::new(kind, "")
    }

    /// Attach a data entry
    pub fn with_data(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Look up a data entry
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }
}
