//! HTTP endpoint tests driving the router directly.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use votehub::config::Config;
use votehub::hub::{Hub, VotingMode};
use votehub::server::{router, state::AppState};

fn app(mode: VotingMode) -> Router {
    let config = Config {
        mode,
        ..Config::default()
    };
    let hub = Hub::start(config.mode, config.queue_capacity, config.connection_buffer);
    router(AppState::new(hub, config))
}

async fn send(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_vote_then_status_and_rooms() {
    let app = app(VotingMode::Rooms);

    let (status, _) = send(&app, "POST", "/event", r#"{"voter":"a","score":"5","room":"r1"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/event", r#"{"voter":"b","score":"3","room":"r1"}"#).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/status", r#""r1""#).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["type"], "status");
    assert_eq!(value["data"]["voters"]["a"]["score"], "5");
    assert_eq!(value["data"]["voters"]["b"]["score"], "3");

    let (status, body) = send(&app, "GET", "/rooms", "").await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value, json!({ "type": "rooms", "rooms": ["r1"] }));
}

#[tokio::test]
async fn test_status_by_path_matches_post() {
    let app = app(VotingMode::Rooms);
    send(&app, "POST", "/event", r#"{"voter":"a","score":"5","room":"r1"}"#).await;

    let (_, posted) = send(&app, "POST", "/status", r#""r1""#).await;
    let (status, by_path) = send(&app, "GET", "/status/r1", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posted, by_path);
}

#[tokio::test]
async fn test_unknown_room_status_is_empty() {
    let app = app(VotingMode::Rooms);

    let (status, body) = send(&app, "POST", "/status", r#""nowhere""#).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value, json!({ "type": "status", "data": { "voters": {} } }));
}

#[tokio::test]
async fn test_bad_requests() {
    let app = app(VotingMode::Rooms);

    let (status, body) = send(&app, "POST", "/event", "{oops").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid vote data");

    let (status, _) = send(&app, "POST", "/event", r#"{"voter":"","score":"1","room":"r"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/status", r#""""#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Invalid room data");

    // Nothing was recorded
    let (_, body) = send(&app, "GET", "/rooms", "").await;
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["rooms"], json!([]));
}

#[tokio::test]
async fn test_tally_duplicate_is_forbidden() {
    let app = app(VotingMode::Tally);

    let (status, body) = send(&app, "POST", "/event", r#"{"voter":"a","score":"yes"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["counts"], json!({ "yes": 1 }));

    let (status, body) = send(&app, "POST", "/event", r#"{"voter":"a","score":"yes"}"#).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Voter has already voted");

    let (_, body) = send(&app, "GET", "/tally", "").await;
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        value,
        json!({ "type": "tally", "data": { "counts": { "yes": 1 }, "voters": 1 } })
    );
}

#[tokio::test]
async fn test_health_reports_mode() {
    let app = app(VotingMode::Tally);

    let (status, body) = send(&app, "GET", "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    let value: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(value["status"], "ok");
    assert_eq!(value["mode"], "tally");
    assert_eq!(value["connections"], 0);
}
