//! Username → live connection map.
//!
//! [`ConnectionRegistry`] is plain synchronous state. It is never shared
//! directly; [`crate::service::PresenceHub`] owns it behind its lock.

use std::collections::HashMap;

use super::connection_handle::{ConnectionHandle, SendOutcome};
use super::ConnectionId;

/// Per-broadcast delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections that had the message queued.
    pub delivered: usize,
    /// Connections whose queue was full.
    pub dropped: usize,
    /// Connections no longer open.
    pub skipped: usize,
}

/// Registered connections keyed by username.
///
/// A username maps to at most one handle. Registering an existing
/// username replaces the previous handle (last writer wins).
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, ConnectionHandle>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `username` to `handle`, returning the handle it replaced.
    pub fn register(
        &mut self,
        username: impl Into<String>,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        self.connections.insert(username.into(), handle)
    }

    /// Removes `username` if present.
    pub fn unregister(&mut self, username: &str) -> Option<ConnectionHandle> {
        self.connections.remove(username)
    }

    /// Removes `username` only if `connection` still owns it.
    ///
    /// Returns `true` when the entry was removed.
    pub fn release(&mut self, username: &str, connection: ConnectionId) -> bool {
        if self.owner(username) != Some(connection) {
            return false;
        }
        self.connections.remove(username).is_some()
    }

    /// Returns the handle registered for `username`.
    #[must_use]
    pub fn get(&self, username: &str) -> Option<&ConnectionHandle> {
        self.connections.get(username)
    }

    /// Returns the id of the connection currently owning `username`.
    #[must_use]
    pub fn owner(&self, username: &str) -> Option<ConnectionId> {
        self.connections.get(username).map(ConnectionHandle::id)
    }

    /// Returns `true` if `username` is registered.
    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.connections.contains_key(username)
    }

    /// Number of registered usernames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if nobody is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Queues `payload` on every open connection. Best effort, no retry.
    pub fn broadcast(&self, payload: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for handle in self.connections.values() {
            if !handle.is_open() {
                report.skipped += 1;
                continue;
            }
            match handle.try_send(payload.to_owned()) {
                SendOutcome::Queued => report.delivered += 1,
                SendOutcome::Full => report.dropped += 1,
                SendOutcome::Closed => report.skipped += 1,
            }
        }
        report
    }
}
