//! Vote submission endpoint.

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::error::VoteError;
use crate::hub::{VoteReceipt, VoteRequest};
use crate::server::state::AppState;

/// POST /event - Submit a vote.
///
/// Body: `{"voter": "...", "score": "..." | null, "room": "..."}`.
///
/// - rooms mode: `200` with an empty body.
/// - tally mode: `200` with the updated counts.
/// - `400` for a malformed body or an empty required field.
/// - `403` if the voter already voted (tally mode).
pub async fn submit_vote(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, VoteError> {
    let vote = decode_vote(&body).inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected vote body");
    })?;

    let receipt = state.hub.gateway().submit(vote).await.inspect_err(|e| {
        tracing::warn!(error = %e, "Rejected vote");
    })?;

    Ok(match receipt {
        VoteReceipt::Recorded => StatusCode::OK.into_response(),
        VoteReceipt::Counted(snapshot) => Json(snapshot).into_response(),
    })
}

fn decode_vote(body: &[u8]) -> Result<VoteRequest, VoteError> {
    serde_json::from_slice(body).map_err(|e| VoteError::Decode(e.to_string()))
}
