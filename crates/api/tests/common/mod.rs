#![allow(dead_code)]

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use printrelay_core::messages::ServerMessage;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use printrelay_api::app::build_app;
use printrelay_api::config::{CorsOrigins, ServerConfig};
use printrelay_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: CorsOrigins::Any,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        heartbeat_interval_secs: 30,
    }
}

/// Build the full application router plus a handle on its state, so tests
/// can open fake connections on the same relay the routes use.
pub fn build_test_app() -> (Router, AppState) {
    let state = AppState::new(test_config());
    let app = build_app(state.clone()).expect("test config is valid");
    (app, state)
}

/// Open a fake WebSocket connection: outbound channel + relay entry.
pub async fn open_conn(state: &AppState, conn_id: &str) -> UnboundedReceiver<Message> {
    let rx = state.ws_manager.add(conn_id.to_string()).await;
    state.relay.connect(conn_id).await;
    rx
}

/// Open a connection and announce an agent under `business`/`branch`.
pub async fn register_agent(
    state: &AppState,
    conn_id: &str,
    business: &str,
    branch: &str,
    agent: &str,
) -> UnboundedReceiver<Message> {
    let rx = open_conn(state, conn_id).await;
    let frame = serde_json::json!({
        "event": "register_agent",
        "data": {
            "agentId": agent,
            "businessId": business,
            "branchId": branch,
            "printerName": format!("{agent}-printer"),
        }
    });
    state.relay.handle_text(conn_id, &frame.to_string()).await;
    rx
}

/// Receive the next outbound message and decode it.
pub async fn recv_event(rx: &mut UnboundedReceiver<Message>) -> ServerMessage {
    match rx.recv().await.expect("channel should yield a message") {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("valid server message"),
        other => panic!("expected text frame, got {other:?}"),
    }
}

pub async fn get(app: Router, path: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(path)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, path: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
