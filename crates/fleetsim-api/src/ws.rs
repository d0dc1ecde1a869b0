//! `WebSocket` handler for streaming live readings.
//!
//! Clients connect to `GET /ws/readings` and receive a JSON-encoded
//! [`WsEvent`] text frame for every tick batch the scheduler
//! publishes. Subscribers that connect after a publish do not receive
//! past batches.
//!
//! If a client falls behind, lagged messages are silently skipped and
//! the client resumes from the most recent batch.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use fleetsim_types::TickBatch;
use tracing::{debug, warn};

use crate::state::AppState;

/// Envelope for every frame pushed over the `WebSocket`.
///
/// Serializes as `{"event": "data", "payload": {...}}` or
/// `{"event": "new_number", "payload": 42}`.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum WsEvent {
    /// A per-tick batch of readings.
    Data(TickBatch),
    /// Random integer from the diagnostic broadcast mode.
    NewNumber(i64),
}

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming readings.
///
/// # Route
///
/// `GET /ws/readings`
pub async fn ws_readings(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: subscribe to the batch and debug
/// channels and forward each event as a text frame.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    let mut batches = state.scheduler.subscribe();
    let mut debug_rx = state.debug_tx.subscribe();

    loop {
        let event = tokio::select! {
            result = batches.recv() => match result {
                Ok(batch) => Some(WsEvent::Data(batch)),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    None
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    debug!("Batch channel closed, shutting down WebSocket");
                    return;
                }
            },
            result = debug_rx.recv() => match result {
                Ok(number) => Some(WsEvent::NewNumber(number)),
                Err(_) => None,
            },
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                        None
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    // Ignore text/binary frames from the client.
                    _ => None,
                }
            }
        };

        let Some(event) = event else { continue };

        let json = match serde_json::to_string(&event) {
            Ok(j) => j,
            Err(e) => {
                warn!("Failed to serialize WebSocket event: {e}");
                continue;
            }
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            debug!("WebSocket client disconnected (send failed)");
            return;
        }
    }
}
