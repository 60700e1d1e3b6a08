//! Model gateway for a local chat endpoint (Ollama `/api/chat` wire format)
//!
//! Request:  `{model, messages: [{role, content, images?}], stream: false}`
//! Response: `{message: {content}}`

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::types::{Message, Role};

pub const DEFAULT_CHAT_URL: &str = "http://localhost:11434/api/chat";

/// Fixed socket timeout for the vision call
pub const VISION_TIMEOUT: Duration = Duration::from_secs(60);

/// Failure talking to the chat endpoint
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// One message on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// Base64-encoded images (vision requests only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
            images: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// User message carrying one image
    pub fn user_with_image(content: impl Into<String>, image: &[u8]) -> Self {
        Self {
            role: Role::User.as_str().to_string(),
            content: content.into(),
            images: Some(vec![BASE64.encode(image)]),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(m: &Message) -> Self {
        Self::new(m.role, m.content.clone())
    }
}

/// Anything that can answer a conversation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the whole conversation and return the assistant's reply text
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, GatewayError>;
}

/// Anything that can describe an image
#[async_trait]
pub trait VisionBackend: Send + Sync {
    async fn analyze_image(&self, image: &[u8], prompt: &str) -> Result<String, GatewayError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Client for one model on a local chat endpoint
#[derive(Clone)]
pub struct OllamaClient {
    client: Arc<Client>,
    url: String,
    model: String,
    timeout: Option<Duration>,
}

impl OllamaClient {
    /// Create a client with no request timeout
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            url: url.into(),
            model: model.into(),
            timeout: None,
        }
    }

    /// Apply a per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Same endpoint and HTTP pool, different model
    pub fn for_model(&self, model: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            url: self.url.clone(),
            model: model.into(),
            timeout: self.timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send(&self, messages: &[ChatMessage], timeout: Option<Duration>) -> Result<String, GatewayError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
        };

        debug!("POST {} model={} messages={}", self.url, self.model, messages.len());

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let response = builder.send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status { status, body });
        }

        parse_reply(&body)
    }
}

/// Pull `message.content` out of a chat response body
pub fn parse_reply(body: &str) -> Result<String, GatewayError> {
    serde_json::from_str::<ChatResponse>(body)
        .map(|r| r.message.content)
        .map_err(|e| GatewayError::Malformed(format!("{} (body: {})", e, crate::truncate_safe(body, 200))))
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, GatewayError> {
        self.send(&messages, self.timeout).await
    }
}

#[async_trait]
impl VisionBackend for OllamaClient {
    async fn analyze_image(&self, image: &[u8], prompt: &str) -> Result<String, GatewayError> {
        let messages = [ChatMessage::user_with_image(prompt, image)];
        self.send(&messages, Some(VISION_TIMEOUT)).await
    }
}
