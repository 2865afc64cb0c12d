//! Control channel over WebSocket.
//!
//! # Responsibilities
//! - Upgrade `GET /api/ws` and register the connection as a control session
//! - Parse inbound text frames into mutation requests
//! - Forward the session's event queue to the socket as JSON text frames
//!
//! # Data Flow
//! ```text
//! Client ──text frame──→ parse_frame → Orchestrator::submit
//! Client ←─text frame─── forwarder ← session queue (snapshots, acks, errors)
//! ```
//!
//! # Design Decisions
//! - Unparseable frames get an `error` event; the session stays open
//! - Binary frames are accepted when they hold UTF-8 text
//! - Disconnect is reported to the orchestrator exactly once, on either side closing
//! - Both outbound queues are bounded; a client that stops reading is closed

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::control::{
    ClientMessage, MutationRequest, Orchestrator, ServerEvent, Session, SESSION_QUEUE_CAPACITY,
};
use crate::http::server::AppState;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let orchestrator = state.registry.orchestrator().clone();
    ws.on_upgrade(move |socket| run_session(socket, orchestrator))
}

/// Decode one inbound frame. Failures become the `error` event to send back.
pub fn parse_frame(text: &str) -> Result<MutationRequest, ServerEvent> {
    serde_json::from_str::<ClientMessage>(text)
        .map(MutationRequest::from)
        .map_err(|e| ServerEvent::Error {
            message: format!("Invalid message: {}", e),
        })
}

async fn run_session(socket: WebSocket, orchestrator: Orchestrator) {
    let Session { id, mut events } = match orchestrator.connect() {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected control connection");
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (local_tx, mut local_rx) = mpsc::channel::<ServerEvent>(SESSION_QUEUE_CAPACITY);

    let mut outbound = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = events.recv() => event,
                event = local_rx.recv() => event,
            };
            let Some(event) = event else { break };

            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(event = event.name(), error = %e, "Failed to serialize event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let inbound = async {
        while let Some(Ok(message)) = ws_rx.next().await {
            let text = match message {
                Message::Text(text) => text.to_string(),
                Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        tracing::debug!(session = %id, len = data.len(), "Ignoring non-UTF8 binary frame");
                        continue;
                    }
                },
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => continue,
            };

            match parse_frame(&text) {
                Ok(request) => {
                    tracing::debug!(session = %id, kind = request.kind().as_str(), "Control request");
                    if orchestrator.submit(id, request).is_err() {
                        break;
                    }
                }
                Err(event) => {
                    tracing::warn!(session = %id, "Unparseable control frame");
                    if local_tx.try_send(event).is_err() {
                        tracing::warn!(session = %id, "Closing control session that is not reading replies");
                        break;
                    }
                }
            }
        }
    };

    tokio::select! {
        _ = inbound => {}
        _ = &mut outbound => {}
    }

    orchestrator.disconnect(id);
    outbound.abort();
}
