//! Agent module - input routing, conversation and model interaction

pub mod actions;
pub mod command;
pub mod conversation;
pub mod dispatcher;
pub mod interactive;
pub mod llm;
pub mod router;

use anyhow::Result;

use crate::config::Config;

/// Answer a single question without speech or desktop access
pub async fn ask_once(config: &Config, message: &str) -> Result<()> {
    let message = message.trim();
    if message.is_empty() {
        anyhow::bail!("Empty message");
    }

    let router = router::PersonaRouter::from_config(config.router.clone(), &config.model, None);
    let mut conversation = conversation::Conversation::with_system_prompt(conversation::system_prompt(
        &config.assistant.name,
        config.assistant.user_name.as_deref(),
    ));
    conversation.push(conversation::Role::User, message.to_string());

    let (persona, reply) = router.answer(message, conversation.to_chat_messages()).await?;
    println!("[Model chosen: {}]", persona);
    println!("{}", reply);
    Ok(())
}
