//! Saba - Personal Desktop Assistant Library
//!
//! A small assistant that:
//! - Routes console input into slash commands, natural-language desktop
//!   actions, or free-form questions for a local chat model
//! - Drives the desktop (mouse, keyboard, screenshots) on request
//! - Speaks every reply through a FIFO speech queue
//! - Optionally listens continuously for voice commands
//! - Exposes the same chat model to a browser extension over HTTP
//!
//! # Example
//!
//! ```ignore
//! use saba::agent::llm::{ChatBackend, ChatMessage, OllamaClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = OllamaClient::new("http://localhost:11434/api/chat", "llama3.1");
//!     let reply = client.chat(vec![ChatMessage::user("Hello!")]).await?;
//!     println!("{}", reply);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod config;
pub mod agent;
pub mod tools;
pub mod voice;
pub mod server;
pub mod cli;

pub use agent::{
    conversation::Conversation,
    dispatcher::{Dispatcher, Outcome},
    llm::{ChatBackend, ChatMessage, GatewayError, OllamaClient, VisionBackend},
    router::{KeywordTable, Persona, PersonaRouter},
};

pub use config::Config;

pub use server::{
    ServerState,
    build_router,
    start as start_server,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Truncate a string to at most `max_chars` characters without splitting a code point
pub fn truncate_safe(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_safe() {
        assert_eq!(truncate_safe("hello", 10), "hello");
        assert_eq!(truncate_safe("hello", 3), "hel");
        assert_eq!(truncate_safe("héllo", 2), "hé");
        assert_eq!(truncate_safe("", 2), "");
    }
}
