//! Message bus for decoupled communication
//!
//! The message bus provides a dual-queue system: inbound messages flow to the
//! orchestrator, outbound messages carry finished turns to observers.

pub mod events;
pub mod queue;

pub use events::{
    is_reserved_sender, Event, EventKind, Message, RESERVED_SENDERS, SENDER_FILE_WATCH,
    SENDER_SYSTEM, SENDER_TIMER, SENDER_USER,
};
pub use queue::{MessageBus, Subscription};
