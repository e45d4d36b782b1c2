//! Core types and traits for agent-relay
//!
//! This crate provides the message and event model, the bus that carries
//! messages between agents, the triggers that wake agents up on their own,
//! and the configuration and logging shared by the other agent-relay crates.

pub mod bus;
pub mod config;
pub mod error;
pub mod event_log;
pub mod logging;
pub mod trigger;
pub mod utils;

pub use bus::{Event, EventKind, Message, MessageBus, Subscription};
pub use error::{Error, Result};
pub use event_log::{EventLog, EventSink};
pub use trigger::{FileWatchTrigger, TimerTrigger, Trigger};
