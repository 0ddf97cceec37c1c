//! WebSocket handler for live vote updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;

use crate::server::state::AppState;

/// WebSocket upgrade handler.
///
/// Browsers must send an `Origin` on the allow-list. Requests without an
/// `Origin` header (non-browser clients) are let through.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    if let Some(origin) = headers.get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|origin| state.config.is_origin_allowed(origin))
            .unwrap_or(false);
        if !allowed {
            tracing::warn!(?origin, "Rejected WebSocket upgrade from disallowed origin");
            return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
        }
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Only the connection set keeps a write handle; once it is removed the
    // outbound queue closes and the send task ends.
    let (conn, mut outbound) = state.hub.connections().connect();
    let id = conn.id();
    drop(conn);
    let dropped = outbound.close_signal();
    tracing::debug!(connection = id, "WebSocket connection opened");

    // Drain the dispatcher's writes onto the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            if sender
                .send(Message::Text(event.as_str().to_string()))
                .await
                .is_err()
            {
                break;
            }
        }
        let _ = sender.close().await;
    });

    // Inbound messages carry nothing the hub acts on; only watch for close
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    // Wait for either task to complete, or for the dispatcher to give up on
    // a client that stopped reading
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
        _ = dropped.closed() => {
            tracing::info!(connection = id, "Dispatcher dropped WebSocket connection");
            send_task.abort();
            recv_task.abort();
        }
    }

    state.hub.connections().remove(id);
    tracing::debug!(connection = id, "WebSocket connection closed");
}
