//! Per-connection WebSocket lifecycle.
//!
//! A connection moves through: connecting (socket open, identity unknown) →
//! active (client sent a valid `join` frame, entry added to the registry) →
//! closed (client close frame, transport error, or join timeout), at which
//! point the registry entry is removed. Forwarded events reach the socket
//! through a bounded channel drained by a dedicated writer task, so the
//! shared subscriber loop never awaits a client.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use courier_common::types::ClientMessage;

use crate::state::GatewayState;

/// GET /ws — upgrade and hand the socket to the connection loop.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (sink, mut stream) = socket.split();

    // Connecting: the first text frame must identify the user.
    let user_id = match wait_for_join(&mut stream, &state).await {
        Some(user_id) => user_id,
        None => return,
    };

    // Active: visible to the dispatcher from here on.
    let (tx, rx) = mpsc::channel::<String>(state.send_buffer);
    let conn_id = state.registry.register(&user_id, tx);
    let writer = tokio::spawn(write_outbound(sink, rx));

    // Read until the client goes away. Inbound frames after `join` carry no
    // meaning in this protocol; pings are answered by axum itself.
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    // Closed: reap promptly so the dispatcher stops targeting this socket.
    state.registry.unregister(conn_id);
    writer.abort();
    tracing::debug!(user_id = %user_id, conn_id = %conn_id, "Connection closed");
}

/// Wait for the identifying `join` frame.
///
/// Returns `None` (and lets the socket drop) if the client sends a frame
/// that is not a valid join, declares a blank user id, disconnects, or says
/// nothing within the join timeout.
async fn wait_for_join(stream: &mut SplitStream<WebSocket>, state: &GatewayState) -> Option<String> {
    let deadline = tokio::time::sleep(state.join_timeout);
    tokio::pin!(deadline);

    loop {
        let frame = tokio::select! {
            frame = stream.next() => frame,
            _ = &mut deadline => {
                tracing::debug!("Connection closed: no join frame within timeout");
                return None;
            }
        };

        let text = match frame {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | None => return None,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Transport error before join");
                return None;
            }
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Join { user_id }) if !user_id.trim().is_empty() => {
                return Some(user_id);
            }
            Ok(ClientMessage::Join { .. }) => {
                tracing::warn!("Connection closed: join frame with blank userId");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Connection closed: malformed join frame");
                return None;
            }
        }
    }
}

/// Drain the bounded outbound channel into the socket. Exits when the
/// channel closes (connection reaped) or the socket rejects a write.
async fn write_outbound(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<String>) {
    while let Some(frame) = rx.recv().await {
        if sink.send(Message::Text(frame.into())).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}
