//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::PresenceHub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Presence hub shared by every WebSocket connection.
    pub hub: Arc<PresenceHub>,
}

impl AppState {
    /// Wraps a hub for injection into the router.
    #[must_use]
    pub fn new(hub: PresenceHub) -> Self {
        Self { hub: Arc::new(hub) }
    }
}
