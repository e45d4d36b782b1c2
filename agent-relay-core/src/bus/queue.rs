//! Async message queue implementation

use super::events::Message;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Receiving end handed out by [`MessageBus::subscribe`]
pub type Subscription = mpsc::UnboundedReceiver<Message>;

/// Async message bus that decouples producers from the orchestrator
///
/// Triggers, callers and re-routed agent replies push to the inbound queue;
/// the orchestrator is its single consumer. Finished turns go to the outbound
/// queue and are copied to every subscriber. Both queues are unbounded FIFOs.
#[derive(Clone)]
pub struct MessageBus {
    inbound_tx: mpsc::UnboundedSender<Message>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<Message>>>,
    outbound_tx: mpsc::UnboundedSender<Message>,
    outbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<Message>>>,
    /// Observers in registration order
    subscribers: Arc<RwLock<Vec<mpsc::UnboundedSender<Message>>>>,
}

impl MessageBus {
    /// Create a new message bus
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Self {
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(outbound_rx)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queue a message for delivery to an agent
    pub fn send(&self, msg: Message) -> crate::Result<()> {
        debug!("Inbound message {} -> {}", msg.sender, msg.to);
        self.inbound_tx
            .send(msg)
            .map_err(|_| crate::Error::BusClosed("Inbound"))
    }

    /// Wait for the next inbound message
    ///
    /// Each message is handed to exactly one caller.
    pub async fn receive(&self) -> crate::Result<Message> {
        self.inbound_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| crate::Error::BusClosed("Inbound"))
    }

    /// Publish a finished turn to the outbound queue and every subscriber
    pub fn reply(&self, msg: Message) -> crate::Result<()> {
        debug!("Outbound message {} -> {}", msg.sender, msg.to);

        {
            let mut subscribers = self.subscribers.write();
            let before = subscribers.len();
            subscribers.retain(|tx| tx.send(msg.clone()).is_ok());
            if subscribers.len() != before {
                debug!(
                    "Dropped {} closed subscriber(s)",
                    before - subscribers.len()
                );
            }
        }

        self.outbound_tx
            .send(msg)
            .map_err(|_| crate::Error::BusClosed("Outbound"))
    }

    /// Wait for the next outbound message
    pub async fn next_reply(&self) -> crate::Result<Message> {
        self.outbound_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| crate::Error::BusClosed("Outbound"))
    }

    /// Register an observer that sees every future reply
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
