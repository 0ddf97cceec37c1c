//! HTTP server module for the vote API and live updates.
//!
//! Provides the REST endpoints for voting and room status, and a
//! WebSocket endpoint that streams every update to connected viewers.

pub mod routes;
pub mod state;
pub mod ws;

use crate::config::Config;
use crate::hub::Hub;
use crate::server::routes::{health, rooms, tally, votes};
use crate::server::state::AppState;
use crate::server::ws::ws_handler;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Builds the router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Voting
        .route("/event", post(votes::submit_vote))
        .route("/tally", get(tally::get_tally))
        // Rooms
        .route("/rooms", get(rooms::list_rooms))
        .route("/status", post(rooms::room_status))
        .route("/status/:room", get(rooms::room_status_by_path))
        // WebSocket
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(Arc::new(state))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%origin, ?e, "Ignoring invalid allowed origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Starts the hub and serves HTTP until the listener fails.
pub async fn run_server(config: Config) -> std::io::Result<()> {
    let hub = Hub::start(config.mode, config.queue_capacity, config.connection_buffer);
    let addr = config.socket_addr();
    let app = router(AppState::new(hub, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await
}
