//! Integration tests for the browser backend routes

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use saba::agent::llm::{ChatBackend, ChatMessage, GatewayError};
use saba::{build_router, Config, ServerState};

// =====================================================================
// HELPERS
// =====================================================================

/// Backend that echoes the user prompt and remembers what it was sent
#[derive(Default)]
struct EchoModel {
    seen: Mutex<Vec<Vec<ChatMessage>>>,
    fail: bool,
}

#[async_trait]
impl ChatBackend for EchoModel {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, GatewayError> {
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.seen.lock().unwrap().push(messages);
        if self.fail {
            return Err(GatewayError::Malformed("model went away".to_string()));
        }
        Ok(format!("echo: {}", last))
    }
}

fn state(model: Arc<EchoModel>, api_key: &str) -> ServerState {
    ServerState {
        name: "Saba".to_string(),
        model: "llama3.1".to_string(),
        api_key: api_key.to_string(),
        frontend_origin: None,
        backend: model,
    }
}

fn app(api_key: &str) -> (Router, Arc<EchoModel>) {
    let model = Arc::new(EchoModel::default());
    (build_router(state(model.clone(), api_key)), model)
}

fn post_chat(body: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// =====================================================================
// PUBLIC ROUTES
// =====================================================================

#[tokio::test]
async fn test_index_is_plain_text() {
    let (app, _) = app("");
    let (status, body) = send(app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "Saba backend is running.");
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app("secret");
    let (status, body) = send_json(app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_status_reports_model_without_key() {
    let (app, _) = app("secret");
    let (status, body) = send_json(app, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Saba");
    assert_eq!(body["model"], "llama3.1");
    assert_eq!(body["version"], saba::VERSION);
}

#[tokio::test]
async fn test_status_reports_model_from_environment() {
    let mut config = Config::default();
    config
        .apply_env_with(|key| (key == "SABA_MODEL").then(|| "mistral:7b-instruct".to_string()))
        .unwrap();
    let app = build_router(ServerState::from_config(&config));

    let (status, body) = send_json(app, get("/api/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "mistral:7b-instruct");
}

// =====================================================================
// /api/chat
// =====================================================================

#[tokio::test]
async fn test_chat_success() {
    let (app, model) = app("");
    let (status, body) = send_json(app, post_chat(r#"{"message":"  hello  "}"#, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "response": "echo: hello"}));

    let seen = model.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0][0].role, "system");
    assert!(seen[0][0].content.contains("Saba"));
    assert_eq!(seen[0][1].role, "user");
}

#[tokio::test]
async fn test_chat_forwards_page_context() {
    let (app, model) = app("");
    let body = r#"{"message":"Summarize","context":"Rust 1.80 released","includePage":true}"#;
    let (status, _) = send_json(app, post_chat(body, None)).await;
    assert_eq!(status, StatusCode::OK);

    let seen = model.seen.lock().unwrap();
    assert_eq!(
        seen[0][1].content,
        "Full page/selected text:\nRust 1.80 released\n\nUser message:\nSummarize"
    );
}

#[tokio::test]
async fn test_chat_empty_message_is_rejected() {
    let (app, model) = app("");
    let (status, body) = send_json(app, post_chat(r#"{"message":"   "}"#, None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Empty message"}));
    assert!(model.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_null_and_missing_message() {
    let (app, _) = app("");
    let (status, body) = send_json(app.clone(), post_chat("null", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty message");

    let (status, body) = send_json(app, post_chat("{}", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty message");
}

#[tokio::test]
async fn test_chat_invalid_json_is_500() {
    let (app, model) = app("");
    let (status, body) = send_json(app, post_chat("{not json", None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    assert!(model.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_wrongly_typed_body_is_500() {
    let (app, model) = app("");

    let (status, body) = send_json(app.clone(), post_chat(r#"{"message":42}"#, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"success": false, "error": "'message' must be a string"}));

    let (status, body) = send_json(app, post_chat(r#"["hi"]"#, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Request body must be a JSON object");
    assert!(model.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_chat_requires_configured_key() {
    let (app, model) = app("s3cret");

    let (status, body) = send_json(app.clone(), post_chat(r#"{"message":"hi"}"#, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "error": "Unauthorized"}));

    let (status, _) = send_json(app.clone(), post_chat(r#"{"message":"hi"}"#, Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(model.seen.lock().unwrap().is_empty());

    let (status, body) = send_json(app, post_chat(r#"{"message":"hi"}"#, Some("s3cret"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "echo: hi");
}

#[tokio::test]
async fn test_chat_backend_failure_is_500() {
    let model = Arc::new(EchoModel { fail: true, ..EchoModel::default() });
    let app = build_router(state(model, ""));

    let (status, body) = send_json(app, post_chat(r#"{"message":"hi"}"#, None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("model went away"));
}

#[tokio::test]
async fn test_requests_are_independent() {
    let (app, model) = app("");
    send_json(app.clone(), post_chat(r#"{"message":"first"}"#, None)).await;
    send_json(app, post_chat(r#"{"message":"second"}"#, None)).await;

    let seen = model.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].len(), 2);
    assert_eq!(seen[1][1].content, "second");
}
