//! API endpoint integration tests

use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use kitty_assistant::api::{ApiState, router};
use kitty_assistant::Session;
use tower::ServiceExt;

mod common;

fn build_test_router(dir: &Path) -> (axum::Router, Arc<Session>) {
    let (session, _) = common::session(dir);
    let session = Arc::new(session);
    (router(ApiState::new(Arc::clone(&session))), session)
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = build_test_router(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_chat_returns_reply() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = build_test_router(dir.path());

    let response = app
        .oneshot(post_json(
            "/api/chat",
            &serde_json::json!({ "message": "tell me a story" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["response"], "echo: tell me a story");
    assert_eq!(json["status"], "success");
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = build_test_router(dir.path());

    let response = app
        .oneshot(post_json("/api/chat", &serde_json::json!({ "message": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = read_json(response).await;
    assert_eq!(json["error"], "No message provided");
}

#[tokio::test]
async fn test_chat_missing_message_field() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = build_test_router(dir.path());

    let response = app
        .oneshot(post_json("/api/chat", &serde_json::json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_goodbye_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    let (app, session) = build_test_router(dir.path());

    let response = app
        .oneshot(post_json("/api/chat", &serde_json::json!({ "message": "goodbye" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!session.is_shutting_down());
}

#[tokio::test]
async fn test_status_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = build_test_router(dir.path());

    let response = app
        .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["status"], "online");
    assert_eq!(json["provider"], "echo");
    assert_eq!(json["conversation_count"], 0);
    assert_eq!(json["activation"], "idle");
    assert_eq!(json["music_playing"], false);
}

#[tokio::test]
async fn test_reset_clears_history() {
    let dir = tempfile::tempdir().unwrap();
    let (app, session) = build_test_router(dir.path());

    session.reply("tell me a story").await;
    assert_eq!(session.router().services().brain.turn_count(), 1);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = read_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Conversation reset");
    assert_eq!(session.router().services().brain.turn_count(), 0);
}

#[tokio::test]
async fn test_stream_sends_words_then_done() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = build_test_router(dir.path());

    let response = app
        .oneshot(post_json(
            "/api/chat/stream",
            &serde_json::json!({ "message": "tell me a story" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();

    let chunks: Vec<serde_json::Value> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();

    let text: String = chunks
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(text, "echo: tell me a story");
    assert_eq!(chunks.last().unwrap()["done"], true);
    assert!(chunks[..chunks.len() - 1].iter().all(|c| c["done"] == false));
}
