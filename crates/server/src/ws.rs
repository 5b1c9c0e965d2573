//! Subscriber-facing websocket endpoint. Grounded on the split-socket /
//! dedicated-sender-task shape common to `axum` websocket handlers: one task
//! drains the hub's outbox onto the wire, the main task reads client frames
//! and forwards them to [`SessionHub::dispatch_client_message`].
//!
//! Unlike a bare log-and-ignore on a malformed frame, a `type` the protocol
//! doesn't recognize gets an explicit `error` message back (see
//! `live-transcripts-protocol`'s deserialization contract) rather than being
//! silently dropped.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};

use live_transcripts_hub::SessionHub;
use live_transcripts_protocol::{ClientMessage, ServerMessage};

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<SessionHub>,
}

pub fn router(hub: Arc<SessionHub>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(AppState { hub })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

async fn handle_socket(socket: WebSocket, hub: Arc<SessionHub>) {
    let (id, outbox) = hub.subscribe().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let sender = tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize outgoing message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while let Some(Ok(msg)) = ws_rx.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => hub.dispatch_client_message(id, client_msg),
                Err(e) => {
                    tracing::debug!(subscriber = id, error = %e, "received an unrecognized message");
                    hub.send_error(
                        id,
                        ServerMessage::Error {
                            kind: "invalid_message".to_string(),
                            message: e.to_string(),
                            request_id: None,
                        },
                    );
                }
            },
            Message::Close(_) => break,
            // binary/ping/pong frames carry no protocol meaning here.
            _ => {}
        }
    }

    hub.unsubscribe(id);
    let _ = sender.await;
}
