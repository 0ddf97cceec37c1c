//! Room listing and room status endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::EnvelopeError;
use crate::hub::OutboundEvent;
use crate::server::state::AppState;

/// GET /rooms - `{"type":"rooms","rooms":[...]}`.
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Response {
    json_event(state.hub.gateway().rooms_event().await)
}

/// POST /status - Body is the room name as a JSON string.
///
/// Unknown rooms return an empty room rather than 404.
pub async fn room_status(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let room = match serde_json::from_slice::<String>(&body) {
        Ok(room) if !room.is_empty() => room,
        _ => return (StatusCode::BAD_REQUEST, "Invalid room data").into_response(),
    };

    json_event(state.hub.gateway().status_event(&room).await)
}

/// GET /status/:room - Same as `POST /status` with the name in the path.
pub async fn room_status_by_path(
    State(state): State<Arc<AppState>>,
    Path(room): Path<String>,
) -> Response {
    json_event(state.hub.gateway().status_event(&room).await)
}

fn json_event(event: Result<OutboundEvent, EnvelopeError>) -> Response {
    match event {
        Ok(event) => (
            [(header::CONTENT_TYPE, "application/json")],
            event.as_str().to_string(),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error encoding response").into_response()
        }
    }
}
