//! WebSocket connection driver.
//!
//! Splits the socket into a reader loop, which feeds the [`Session`] in
//! arrival order, and a writer task, which drains the connection's bounded
//! outbound queue. When either side stops, the session is closed and the
//! hub cleans up after it.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use super::session::Session;
use crate::service::PresenceHub;

/// Runs a single WebSocket connection to completion.
pub async fn run_connection(socket: WebSocket, hub: Arc<PresenceHub>) {
    let (handle, mut outbound_rx) = hub.open_connection();
    let connection = handle.id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(payload) = outbound_rx.recv().await {
            if ws_tx.send(Message::text(payload)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    tracing::debug!(%connection, "ws connection opened");
    let mut session = Session::new(hub, handle);

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => session.handle_text(text.as_str()).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(%connection, error = %e, "ws transport error");
                        break;
                    }
                }
            }
            _ = &mut writer => {
                tracing::debug!(%connection, "ws writer stopped");
                break;
            }
        }
    }

    session.close().await;
    writer.abort();
    tracing::debug!(%connection, "ws connection closed");
}
