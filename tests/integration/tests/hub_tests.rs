//! Hub Integration Tests
//!
//! Each test starts its own server on an ephemeral port; no external services
//! are required.
//!
//! Run with: cargo test -p integration-tests --test hub_tests

use chrono::DateTime;
use futures_util::SinkExt;
use integration_tests::{
    assert_error, assert_json, expect_closed, recv_json, unique_user, PublishEventRequest,
    TestServer,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_root_reports_healthy() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/").await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body, json!({ "status": "healthy", "message": "Server is running" }));

    let response = server.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

// ============================================================================
// Upgrade authentication
// ============================================================================

#[tokio::test]
async fn test_ws_without_token_is_rejected() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/ws").await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "MISSING_AUTH");
}

#[tokio::test]
async fn test_ws_with_invalid_token_is_rejected() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/ws?token=not-a-token").await.unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "INVALID_TOKEN");

    match connect_async(server.ws_url("not-a-token")).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 401);
        }
        other => panic!("expected HTTP 401 handshake failure, got {other:?}"),
    }

    let stats = server.stats().await.unwrap();
    assert_eq!(stats["stats"]["registered"], 0);
}

#[tokio::test]
async fn test_ws_without_upgrade_headers() {
    let server = TestServer::start().await.unwrap();
    let token = server.token("plain-http").unwrap();

    let response = server.get(&format!("/ws?token={token}")).await.unwrap();
    let code = assert_error(response, StatusCode::UPGRADE_REQUIRED).await.unwrap();
    assert_eq!(code, "UPGRADE_REQUIRED");
}

// ============================================================================
// Broadcast
// ============================================================================

#[tokio::test]
async fn test_published_event_reaches_every_client() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect(&unique_user("alice")).await.unwrap();
    let mut bob = server.connect(&unique_user("bob")).await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    let publisher = server.token(&unique_user("publisher")).unwrap();
    let event = PublishEventRequest::task_updated();
    let response = server.post_auth("/api/events", &publisher, &event).await.unwrap();
    let accepted: Value = assert_json(response, StatusCode::ACCEPTED).await.unwrap();
    assert_eq!(accepted["type"], "task.updated");

    for socket in [&mut alice, &mut bob] {
        let envelope = recv_json(socket).await.unwrap();
        assert_eq!(envelope["type"], "task.updated");
        assert_eq!(envelope["data"], event.data);
        let timestamp = envelope["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }
}

#[tokio::test]
async fn test_events_arrive_in_publish_order() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect(&unique_user("ordered")).await.unwrap();
    server.wait_for_connections(1).await.unwrap();

    let publisher = server.token("publisher").unwrap();
    for n in 0..5 {
        let event = PublishEventRequest::new("task.created", json!({ "n": n }));
        let response = server.post_auth("/api/events", &publisher, &event).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    for n in 0..5 {
        let envelope = recv_json(&mut socket).await.unwrap();
        assert_eq!(envelope["data"]["n"], n);
    }
}

#[tokio::test]
async fn test_publish_requires_auth() {
    let server = TestServer::start().await.unwrap();

    let response = server
        .post("/api/events", &PublishEventRequest::task_updated())
        .await
        .unwrap();
    let code = assert_error(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(code, "MISSING_AUTH");
}

#[tokio::test]
async fn test_publish_rejects_empty_type() {
    let server = TestServer::start().await.unwrap();
    let token = server.token("publisher").unwrap();

    let event = PublishEventRequest::new("  ", json!({}));
    let response = server.post_auth("/api/events", &token, &event).await.unwrap();
    let code = assert_error(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(code, "INVALID_INPUT");
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test]
async fn test_application_ping_gets_pong() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect("pinger").await.unwrap();

    socket
        .send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await
        .unwrap();

    let reply = recv_json(&mut socket).await.unwrap();
    assert_eq!(reply, json!({ "type": "pong" }));
}

#[tokio::test]
async fn test_malformed_message_keeps_connection() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect("sloppy").await.unwrap();

    socket.send(Message::Text("{not json".to_string())).await.unwrap();
    socket
        .send(Message::Text(r#"{"type":"ping"}"#.to_string()))
        .await
        .unwrap();

    let reply = recv_json(&mut socket).await.unwrap();
    assert_eq!(reply["type"], "pong");
    server.wait_for_connections(1).await.unwrap();
}

#[tokio::test]
async fn test_client_close_unregisters() {
    let server = TestServer::start().await.unwrap();
    let user = unique_user("leaver");
    let mut socket = server.connect(&user).await.unwrap();
    server.wait_for_connections(1).await.unwrap();

    let stats = server.stats().await.unwrap();
    assert_eq!(stats["users"], json!([user]));

    socket.close(None).await.unwrap();
    server.wait_for_connections(0).await.unwrap();

    let stats = server.stats().await.unwrap();
    assert_eq!(stats["stats"]["unregistered"], 1);
    assert_eq!(stats["users"], json!([]));
}

#[tokio::test]
async fn test_oversized_frame_ends_connection() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect("chatty").await.unwrap();
    server.wait_for_connections(1).await.unwrap();

    let payload = json!({ "type": "note", "data": "x".repeat(2048) }).to_string();
    // The server may reset the connection before the send completes
    let _ = socket.send(Message::Text(payload)).await;

    server.wait_for_connections(0).await.unwrap();
    expect_closed(&mut socket).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let server = TestServer::start().await.unwrap();
    let mut first = server.connect("first").await.unwrap();
    let mut second = server.connect("second").await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    server.shutdown().await.unwrap();

    expect_closed(&mut first).await.unwrap();
    expect_closed(&mut second).await.unwrap();
}
