//! Integration tests for the chat gateway against an in-process stand-in
//! for the local model endpoint

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use saba::agent::llm::{ChatBackend, ChatMessage, GatewayError, OllamaClient, VisionBackend};

// =====================================================================
// STAND-IN ENDPOINT
// =====================================================================

#[derive(Clone)]
struct Endpoint {
    /// Request bodies received so far
    received: Arc<Mutex<Vec<Value>>>,
    status: StatusCode,
    reply: Value,
}

async fn chat(State(endpoint): State<Endpoint>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    endpoint.received.lock().unwrap().push(body);
    (endpoint.status, Json(endpoint.reply.clone()))
}

/// Serve `reply` with `status` on an ephemeral port; returns the chat URL
async fn serve(status: StatusCode, reply: Value) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let endpoint = Endpoint { received: received.clone(), status, reply };
    let app = Router::new().route("/api/chat", post(chat)).with_state(endpoint);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/api/chat", addr), received)
}

// =====================================================================
// CHAT
// =====================================================================

#[tokio::test]
async fn test_chat_wire_format() {
    let (url, received) = serve(StatusCode::OK, json!({"message": {"role": "assistant", "content": "Hi there!"}})).await;
    let client = OllamaClient::new(url, "llama3.1");

    let reply = client
        .chat(vec![ChatMessage::system("Be brief."), ChatMessage::user("Hello")])
        .await
        .unwrap();
    assert_eq!(reply, "Hi there!");

    let bodies = received.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({
            "model": "llama3.1",
            "stream": false,
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hello"}
            ]
        })
    );
}

#[tokio::test]
async fn test_persona_model_shares_endpoint() {
    let (url, received) = serve(StatusCode::OK, json!({"message": {"content": "ok"}})).await;
    let client = OllamaClient::new(url, "llama3.1").for_model("qwen2.5-coder");

    client.chat(vec![ChatMessage::user("fix it")]).await.unwrap();
    assert_eq!(received.lock().unwrap()[0]["model"], "qwen2.5-coder");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let (url, _) = serve(StatusCode::NOT_FOUND, json!({"error": "model 'nope' not found"})).await;
    let client = OllamaClient::new(url, "nope");

    let err = client.chat(vec![ChatMessage::user("hi")]).await.unwrap_err();
    match err {
        GatewayError::Status { status, body } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert!(body.contains("not found"));
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_content_is_malformed() {
    let (url, _) = serve(StatusCode::OK, json!({"done": true})).await;
    let client = OllamaClient::new(url, "llama3.1");

    let err = client.chat(vec![ChatMessage::user("hi")]).await.unwrap_err();
    assert!(matches!(err, GatewayError::Malformed(_)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OllamaClient::new(format!("http://{}/api/chat", addr), "llama3.1");
    let err = client.chat(vec![ChatMessage::user("hi")]).await.unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
}

// =====================================================================
// VISION
// =====================================================================

#[tokio::test]
async fn test_vision_sends_one_image_message() {
    let (url, received) = serve(StatusCode::OK, json!({"message": {"content": "A terminal window."}})).await;
    let client = OllamaClient::new(url, "llava");

    let description = client.analyze_image(b"png", "Describe what you see on my screen.").await.unwrap();
    assert_eq!(description, "A terminal window.");

    let bodies = received.lock().unwrap();
    assert_eq!(bodies[0]["model"], "llava");
    assert_eq!(bodies[0]["stream"], false);
    assert_eq!(
        bodies[0]["messages"],
        json!([{
            "role": "user",
            "content": "Describe what you see on my screen.",
            "images": ["cG5n"]
        }])
    );
}
