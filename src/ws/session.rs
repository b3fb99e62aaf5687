//! Per-connection lifecycle state machine.
//!
//! ```text
//! Unregistered ──register──▶ Registered ──register──▶ Registered
//!       │                        │
//!       └──────close/error───────┴──────────▶ Closed
//! ```
//!
//! Malformed frames are logged and dropped in every state. Frames arriving
//! after `Closed` are ignored.

use std::sync::Arc;

use super::messages::{ClientMessage, ServerMessage};
use crate::domain::{ConnectionHandle, Registration};
use crate::error::HubError;
use crate::service::PresenceHub;

/// Lifecycle state of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, no `register` seen yet.
    Unregistered,
    /// Bound to a username and role.
    Registered(Registration),
    /// Torn down; cleanup has run.
    Closed,
}

/// Drives one connection's inbound messages against the hub.
#[derive(Debug)]
pub struct Session {
    hub: Arc<PresenceHub>,
    handle: ConnectionHandle,
    state: SessionState,
}

impl Session {
    /// Starts a session in [`SessionState::Unregistered`].
    #[must_use]
    pub const fn new(hub: Arc<PresenceHub>, handle: ConnectionHandle) -> Self {
        Self {
            hub,
            handle,
            state: SessionState::Unregistered,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handles one inbound text frame.
    pub async fn handle_text(&mut self, text: &str) {
        if self.state == SessionState::Closed {
            tracing::debug!(connection = %self.handle.id(), "frame after close ignored");
            return;
        }

        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(connection = %self.handle.id(), error = %e, "discarding malformed message");
                return;
            }
        };
        tracing::debug!(connection = %self.handle.id(), kind = message.kind(), "message received");

        let current = match &self.state {
            SessionState::Registered(registration) => Some(registration),
            _ => None,
        };

        let result = match (message, current) {
            (ClientMessage::Register { username, role }, previous) => {
                let registration = Registration::new(username, role.unwrap_or_default());
                let registered = self
                    .hub
                    .register(&self.handle, previous, &registration)
                    .await;
                match registered {
                    Ok(()) => self.state = SessionState::Registered(registration),
                    Err(e) => {
                        tracing::warn!(connection = %self.handle.id(), error = %e, "discarding invalid register");
                    }
                }
                return;
            }
            (request, None) => {
                tracing::warn!(
                    connection = %self.handle.id(),
                    kind = request.kind(),
                    "ignoring message from unregistered connection"
                );
                return;
            }
            (ClientMessage::GetProfList, Some(_)) => {
                self.hub.send_prof_list(&self.handle).await;
                Ok(())
            }
            (ClientMessage::ToggleAvailability, Some(registration)) => self
                .hub
                .toggle_availability(&self.handle, registration)
                .await
                .map(|_| ()),
            (ClientMessage::DemandAppel { target }, Some(registration)) => {
                self.hub
                    .request_call(&self.handle, registration, &target)
                    .await
            }
            (ClientMessage::AnnulerAppel { target }, Some(registration)) => {
                self.hub
                    .cancel_call(&self.handle, registration, &target)
                    .await
            }
            (ClientMessage::AccepterAppel { eleve }, Some(registration)) => {
                self.hub.accept_call(&self.handle, registration, &eleve).await
            }
        };

        if let Err(e) = result {
            tracing::info!(connection = %self.handle.id(), error = %e, "request rejected");
            self.reply_error(&e);
        }
    }

    /// Runs the disconnect path and moves to [`SessionState::Closed`].
    pub async fn close(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::Closed);
        match previous {
            SessionState::Registered(registration) => {
                self.hub.disconnect(&self.handle, &registration).await;
            }
            SessionState::Unregistered => {
                tracing::debug!(connection = %self.handle.id(), "unregistered connection closed");
            }
            SessionState::Closed => {}
        }
    }

    fn reply_error(&self, error: &HubError) {
        let reply = ServerMessage::Erreur {
            message: error.to_string(),
        };
        if let Ok(payload) = reply.to_json() {
            let _ = self.handle.try_send(payload);
        }
    }
}
