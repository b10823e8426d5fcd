// Inbound handoff from the web content's context to the screen's context
//
// Script messages arrive on whatever thread the browser engine uses for its
// message handlers. Registry and component state is single-threaded (`Rc`,
// `RefCell`), so raw messages are queued here and only decoded/dispatched
// once the host drains the queue on its own serialized context.
//
// Two ways to drive the receiving end:
// - `drain`: synchronous, for hosts that pump from their UI loop
// - `run`:   async, for hosts running a `tokio::task::LocalSet`

use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};
use std::rc::Rc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Create a bounded inbound queue
///
/// A capacity of zero is bumped to one (tokio channels require a non-zero buffer).
pub fn channel(capacity: usize) -> (InboundSender, InboundReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (InboundSender { tx, capacity }, InboundReceiver { rx })
}

/// Sending half, handed to the browser engine's message handler
///
/// `Clone + Send`: safe to move onto the web content's thread.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: mpsc::Sender<String>,
    capacity: usize,
}

impl InboundSender {
    /// Queue a raw message without blocking
    pub fn post(&self, raw: impl Into<String>) -> Result<()> {
        self.tx.try_send(raw.into()).map_err(|e| match e {
            TrySendError::Full(_) => BridgeError::InboundQueueFull {
                capacity: self.capacity,
            },
            TrySendError::Closed(_) => BridgeError::InboundQueueClosed,
        })
    }

    /// Queue a raw message, waiting for room when the queue is full
    pub async fn post_async(&self, raw: impl Into<String>) -> Result<()> {
        self.tx
            .send(raw.into())
            .await
            .map_err(|_| BridgeError::InboundQueueClosed)
    }

    /// Whether the screen side has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, owned by the screen's serialized context
#[derive(Debug)]
pub struct InboundReceiver {
    rx: mpsc::Receiver<String>,
}

impl InboundReceiver {
    /// Deliver everything queued so far to `bridge`
    ///
    /// Returns how many messages were accepted by the registry.
    pub fn drain(&mut self, bridge: &Bridge) -> usize {
        let mut accepted = 0;
        while let Ok(raw) = self.rx.try_recv() {
            if bridge.receive(&raw) {
                accepted += 1;
            }
        }
        accepted
    }

    /// Deliver messages as they arrive until every sender is dropped
    ///
    /// Returns how many messages were accepted. The future is `!Send`; spawn
    /// it with `tokio::task::spawn_local`.
    pub async fn run(mut self, bridge: Rc<Bridge>) -> usize {
        let mut accepted = 0;
        while let Some(raw) = self.rx.recv().await {
            if bridge.receive(&raw) {
                accepted += 1;
            }
        }
        tracing::debug!(web_view = %bridge.web_view(), accepted, "bridge inbound queue closed");
        accepted
    }
}
