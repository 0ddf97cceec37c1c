//! Tally counts endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct TallyData {
    pub counts: BTreeMap<String, u64>,
    pub voters: usize,
}

#[derive(Debug, Serialize)]
pub struct TallyResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: TallyData,
}

/// GET /tally - Current counts in tally mode (empty in rooms mode).
pub async fn get_tally(State(state): State<Arc<AppState>>) -> Json<TallyResponse> {
    let (counts, voters) = state.hub.gateway().tally_summary().await;
    Json(TallyResponse {
        kind: "tally",
        data: TallyData { counts, voters },
    })
}
