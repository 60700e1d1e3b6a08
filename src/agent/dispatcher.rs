//! Turns one line of input into exactly one outcome
//!
//! Slash commands and natural actions never reach the chat model. Free-form
//! queries are appended to the conversation, routed to a persona, answered
//! with the full history and the answer appended in turn. Every reply is
//! queued for speech exactly once.

use anyhow::Result;

use super::actions::{ActionExecutor, LOOK_PROMPT};
use super::command::{Command, SlashCommand, SLASH_HELP};
use super::conversation::{system_prompt, Conversation, Role};
use super::router::{Persona, PersonaRouter};
use crate::config::AssistantConfig;
use crate::voice::mode::VoiceMode;

/// Result of dispatching one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Direct reply from a command or action
    Reply(String),
    /// Model answer for a free-form query
    Answer { persona: Persona, text: String },
    /// Nothing to say (blank line, action missing its argument)
    Silent,
}

impl Outcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            Outcome::Reply(text) | Outcome::Answer { text, .. } => Some(text),
            Outcome::Silent => None,
        }
    }
}

pub struct Dispatcher {
    assistant: AssistantConfig,
    conversation: Conversation,
    router: PersonaRouter,
    actions: ActionExecutor,
    voice: VoiceMode,
}

impl Dispatcher {
    pub fn new(
        assistant: AssistantConfig,
        router: PersonaRouter,
        actions: ActionExecutor,
        voice: VoiceMode,
    ) -> Self {
        let conversation = Conversation::with_system_prompt(system_prompt(
            &assistant.name,
            assistant.user_name.as_deref(),
        ));
        Self {
            assistant,
            conversation,
            router,
            actions,
            voice,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn voice(&self) -> &VoiceMode {
        &self.voice
    }

    pub fn actions(&self) -> &ActionExecutor {
        &self.actions
    }

    /// Handle one line and speak whatever comes back
    pub async fn dispatch(&mut self, input: &str) -> Result<Outcome> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Outcome::Silent);
        }

        let command = Command::parse(input, self.assistant.command_prefix, &self.assistant.name);
        tracing::debug!("Parsed input as {:?}", command);

        let outcome = match command {
            Command::Slash(cmd) => Outcome::Reply(self.run_slash(cmd).await?),
            Command::Natural(action) => match self.actions.run_natural(action).await? {
                Some(reply) => Outcome::Reply(reply),
                None => Outcome::Silent,
            },
            Command::Query(text) => self.ask(text).await?,
        };

        if let Some(text) = outcome.text() {
            self.actions.speaker().speak(text);
        }
        Ok(outcome)
    }

    async fn run_slash(&mut self, cmd: SlashCommand) -> Result<String> {
        let name = &self.assistant.name;
        let reply = match cmd {
            SlashCommand::VoiceOn => {
                if self.voice.start() {
                    format!("Voice mode activated. {} is now listening.", name)
                } else {
                    "Voice mode is already active.".to_string()
                }
            }
            SlashCommand::VoiceOff => {
                if self.voice.stop() {
                    format!("Voice mode deactivated. {} stopped listening.", name)
                } else {
                    "Voice mode is already off.".to_string()
                }
            }
            SlashCommand::Demo => self.actions.demo().await?,
            SlashCommand::Talk => self.assistant.greeting(),
            SlashCommand::Open(app) if app.is_empty() => "Please specify an app to open.".to_string(),
            SlashCommand::Open(app) => self.actions.open_application(&app).await?,
            SlashCommand::Look => self.actions.look(LOOK_PROMPT).await,
            SlashCommand::Help => self.help(),
            SlashCommand::Unknown(_) => "Unknown command.".to_string(),
        };
        Ok(reply)
    }

    /// Free-form query through the persona router
    ///
    /// The user message stays in the history even when the model call
    /// fails; the history is append-only.
    async fn ask(&mut self, text: String) -> Result<Outcome> {
        self.conversation.push(Role::User, text.clone());
        let history = self.conversation.to_chat_messages();

        let (persona, reply) = self.router.answer(&text, history).await?;
        self.conversation.push(Role::Assistant, reply.clone());
        tracing::debug!("{}", self.conversation.summary());

        Ok(Outcome::Answer { persona, text: reply })
    }

    /// Command list for `/help`
    pub fn help(&self) -> String {
        let prefix = self.assistant.command_prefix;
        let mut lines = vec!["Commands:".to_string()];
        for (keyword, description) in SLASH_HELP {
            lines.push(format!("  {}{:<12} {}", prefix, keyword, description));
        }
        lines.push(format!(
            "Or start with my name: \"{} open <app>\", \"{} type <text>\", click, scroll, search, look.",
            self.assistant.name, self.assistant.name
        ));
        lines.join("\n")
    }

    /// Stop voice mode and wait for its loop
    pub async fn shutdown(&mut self) {
        self.voice.shutdown().await;
    }
}
