mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use serde_json::Value;
use tower::ServiceExt;

use common::*;
use sr_domain::config::Config;
use sr_gateway::api;
use sr_gateway::state::AppState;
use sr_sessions::MemoryTranscriptStore;

fn app(backend: Arc<ScriptedBackend>) -> Router {
    let orchestrator = orchestrator(
        Arc::new(MemoryTranscriptStore::new()),
        backend,
        quick_settings(),
    );
    let state = AppState {
        config: Arc::new(Config::default()),
        orchestrator,
        started_at: Instant::now(),
    };
    api::router().with_state(state)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let resp = app(Arc::new(ScriptedBackend::default())).oneshot(get("/api/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn crisis_resources_are_listed() {
    let resp = app(Arc::new(ScriptedBackend::default()))
        .oneshot(get("/api/crisis-resources"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["resources"].as_array().unwrap().len(), 5);
    assert!(body["emergency"].as_str().unwrap().contains("911"));
}

#[tokio::test]
async fn post_message_returns_outcome() {
    let app = app(ScriptedBackend::new([reply("I'm glad you reached out.")]));

    let resp = app
        .clone()
        .oneshot(post_json("/api/sessions/alice/messages", serde_json::json!({ "text": "hi" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["resolution"], "resolved");
    assert_eq!(body["user_message"]["text"], "hi");
    assert_eq!(body["reply"]["text"], "I'm glad you reached out.");
    assert_eq!(body["crisis"]["matched"], false);
    assert!(body.get("crisis_resources").is_none());

    let resp = app.oneshot(get("/api/sessions/alice/transcript")).await.unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["state"], "idle");
    assert_eq!(body["messages"][0]["sender"], "user");
    assert_eq!(body["messages"][1]["sender"], "assistant");
}

#[tokio::test]
async fn crisis_message_includes_resources() {
    let resp = app(Arc::new(ScriptedBackend::default()))
        .oneshot(post_json(
            "/api/sessions/alice/messages",
            serde_json::json!({ "text": "I want to end my life" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["crisis"]["matched"], true);
    assert_eq!(body["crisis_resources"]["resources"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn empty_text_is_bad_request() {
    let resp = app(Arc::new(ScriptedBackend::default()))
        .oneshot(post_json("/api/sessions/alice/messages", serde_json::json!({ "text": "  " })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"], "empty_input");
}

#[tokio::test]
async fn busy_session_is_conflict() {
    let app = app(ScriptedBackend::new([slow_reply("slow", Duration::from_secs(5))]));

    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/sessions/alice/messages?wait=false",
            serde_json::json!({ "text": "first" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body = json_body(resp).await;
    assert_eq!(body["user_message"]["text"], "first");
    assert_eq!(body["state"], "awaiting_completion");

    let resp = app
        .oneshot(post_json("/api/sessions/alice/messages", serde_json::json!({ "text": "second" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["error"], "session_busy");
}

#[tokio::test]
async fn delete_erases_transcript() {
    let app = app(Arc::new(ScriptedBackend::default()));
    app.clone()
        .oneshot(post_json("/api/sessions/bob/messages", serde_json::json!({ "text": "hello" })))
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/sessions/bob")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["removed"], 2);

    let body = json_body(app.oneshot(get("/api/sessions/bob/transcript")).await.unwrap()).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn delete_during_pending_reply_is_conflict() {
    let app = app(ScriptedBackend::new([slow_reply("slow", Duration::from_secs(5))]));
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/sessions/dana/messages?wait=false",
            serde_json::json!({ "text": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/sessions/dana")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(resp).await["error"], "session_busy");

    let body = json_body(app.oneshot(get("/api/sessions/dana/transcript")).await.unwrap()).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn stream_emits_transcript_event() {
    let app = app(ScriptedBackend::new([reply("hey")]));
    app.clone()
        .oneshot(post_json("/api/sessions/carol/messages", serde_json::json!({ "text": "hello" })))
        .await
        .unwrap();

    let resp = app.oneshot(get("/api/sessions/carol/stream")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let mut stream = resp.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let text = String::from_utf8(chunk.to_vec()).unwrap();
    assert!(text.contains("event: transcript"));
    assert!(text.contains("\"hello\""));
    assert!(text.contains("\"hey\""));
}
