//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::hub::VotingMode;
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub mode: VotingMode,
    pub connections: usize,
    pub started_at: String,
}

/// GET /health - Liveness plus a few counters.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: state.hub.mode(),
        connections: state.hub.connections().len(),
        started_at: state.hub.started_at().to_rfc3339(),
    })
}
