//! Conversation history for one console session

use chrono::Utc;

use super::llm::ChatMessage;
// Re-export types from the shared types module
pub use crate::types::{Message, Role};

/// Append-only conversation history
///
/// Seeded with the system prompt when the session starts and never
/// truncated or rewritten afterwards.
pub struct Conversation {
    /// Unique conversation ID
    pub id: String,
    messages: Vec<Message>,
}

impl Conversation {
    /// Create a new empty conversation
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
        }
    }

    /// Create a conversation whose first message is `prompt`
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        let mut conv = Self::new();
        conv.push(Role::System, prompt.into());
        conv
    }

    /// Append a message
    pub fn push(&mut self, role: Role, content: String) {
        self.messages.push(Message {
            role,
            content,
            timestamp: Utc::now(),
        });
    }

    /// Every message, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get messages formatted for the chat endpoint
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(ChatMessage::from).collect()
    }

    /// Get a summary of the conversation for display
    pub fn summary(&self) -> String {
        let user_count = self.messages.iter().filter(|m| m.role == Role::User).count();
        let assistant_count = self.messages.iter().filter(|m| m.role == Role::Assistant).count();

        format!(
            "Conversation {}: {} messages ({} user, {} assistant)",
            self.id,
            self.messages.len(),
            user_count,
            assistant_count
        )
    }

    /// Check if the conversation is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// System prompt that opens every console session
pub fn system_prompt(assistant_name: &str, user_name: Option<&str>) -> String {
    let user = user_name.unwrap_or("the user");
    format!(
        "You are {name}, a personal desktop assistant for {user}. \
         Answer clearly and directly with practical steps. \
         Keep replies short enough to be read aloud. \
         If a request is ambiguous, ask one short follow-up question.",
        name = assistant_name,
        user = user,
    )
}
