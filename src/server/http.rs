//! HTTP handlers for the browser backend

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::agent::llm::ChatMessage;
use crate::server::ServerState;

/// Why a `/api/chat` body could not be read
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Request body must be a JSON object")]
    NotAnObject,
    #[error("'{0}' must be a string")]
    NotAString(&'static str),
}

/// Body of `POST /api/chat`, normalised
///
/// A falsy body (`null`, `{}`, `""`, `0`, `false`, `[]`) reads as an empty
/// object, and a falsy field as an empty string. Any other non-object body
/// or non-string field is an error.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub context: String,
    /// `includePage` or `include_page`, with loose truthiness
    pub include_page: bool,
}

impl ChatRequest {
    pub fn parse(body: &[u8]) -> Result<Self, BodyError> {
        let value: Value = serde_json::from_slice(body)?;
        if !truthy(&value) {
            return Ok(Self::default());
        }
        let Value::Object(fields) = value else {
            return Err(BodyError::NotAnObject);
        };

        Ok(Self {
            message: text_field(field(&fields, "message"), "message")?,
            context: text_field(field(&fields, "context"), "context")?,
            include_page: truthy(field(&fields, "includePage")) || truthy(field(&fields, "include_page")),
        })
    }
}

static MISSING: Value = Value::Null;

fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> &'a Value {
    fields.get(name).unwrap_or(&MISSING)
}

/// Trimmed string value; falsy values count as empty
fn text_field(value: &Value, name: &'static str) -> Result<String, BodyError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        other if !truthy(other) => Ok(String::new()),
        _ => Err(BodyError::NotAString(name)),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Body of every `/api/chat` reply
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    pub fn ok(response: impl Into<String>) -> Self {
        Self { success: true, response: Some(response.into()), error: None }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self { success: false, response: None, error: Some(error.into()) }
    }
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub name: String,
    pub version: String,
    pub model: String,
}

/// Wrap the user's message with page context when there is any
pub fn build_prompt(message: &str, context: &str, include_page: bool) -> String {
    if context.is_empty() {
        return message.to_string();
    }
    let label = if include_page {
        "Full page/selected text:"
    } else {
        "Context from the webpage/user:"
    };
    format!("{}\n{}\n\nUser message:\n{}", label, context, message)
}

/// System prompt for the browser assistant
pub fn browser_system_prompt(name: &str) -> String {
    format!("You are {}, a helpful browser assistant. Be concise and practical.", name)
}

/// Liveness text
pub async fn index_handler(State(state): State<ServerState>) -> String {
    format!("{} backend is running.", state.name)
}

/// Health check
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Name, version and model
pub async fn status_handler(State(state): State<ServerState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        name: state.name.clone(),
        version: crate::VERSION.to_string(),
        model: state.model.clone(),
    })
}

/// One-shot chat for the browser extension
pub async fn chat_handler(
    State(state): State<ServerState>,
    body: Bytes,
) -> impl IntoResponse {
    let ChatRequest { message, context, include_page } = match ChatRequest::parse(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected chat request: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(ChatResponse::error(e.to_string())));
        }
    };

    if message.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(ChatResponse::error("Empty message")));
    }

    info!(
        "Chat request: message={} chars, context={} chars, include_page={}",
        message.chars().count(),
        context.chars().count(),
        include_page
    );

    let messages = vec![
        ChatMessage::system(browser_system_prompt(&state.name)),
        ChatMessage::user(build_prompt(&message, &context, include_page)),
    ];

    match state.backend.chat(messages).await {
        Ok(reply) => (StatusCode::OK, Json(ChatResponse::ok(reply))),
        Err(e) => {
            warn!("Chat request failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ChatResponse::error(e.to_string())))
        }
    }
}
