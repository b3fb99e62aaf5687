//! Outbound side of a live connection.
//!
//! A [`ConnectionHandle`] is the only thing the hub ever holds for a peer:
//! a bounded [`tokio::sync::mpsc`] queue drained by the connection's writer
//! task. Sends never wait. A peer that stops reading fills its own queue and
//! loses messages; nobody else is slowed down.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::ConnectionId;

/// Result of a non-blocking send to one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Payload was queued for the writer task.
    Queued,
    /// The peer's queue is full; payload dropped.
    Full,
    /// The writer side is gone; the connection is no longer open.
    Closed,
}

/// Cloneable handle to a connection's bounded outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<String>,
}

impl ConnectionHandle {
    /// Creates a handle and the receiver its writer task should drain.
    ///
    /// A `capacity` of zero is raised to one.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    /// Returns this connection's identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` while the writer side still accepts messages.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queues a serialized message without waiting.
    pub fn try_send(&self, payload: String) -> SendOutcome {
        match self.tx.try_send(payload) {
            Ok(()) => SendOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(connection = %self.id, "outbound queue full, dropping message");
                SendOutcome::Full
            }
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }
}
