//! Interactive console - the assistant's main loop
//!
//! Reads lines with rustyline, hands them to the dispatcher, prints and
//! speaks the result. The hotkey listener and the voice loop run beside it.

use anyhow::{Context, Result};
use crossterm::{execute, style::{Color, Print, ResetColor, SetForegroundColor}};
use rustyline::error::ReadlineError;
use std::io;
use std::sync::Arc;

use super::actions::ActionExecutor;
use super::dispatcher::{Dispatcher, Outcome};
use super::llm::OllamaClient;
use super::router::PersonaRouter;
use crate::config::Config;
use crate::tools::desktop::DesktopTool;
use crate::voice::{CloudListener, Speaker, SystemVoice, VoiceMode};

/// Console start-up switches
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleOptions {
    /// Start with voice mode on
    pub voice: bool,
    /// Skip the global hotkey listener
    pub no_hotkey: bool,
}

/// Print colored output
fn print_colored(text: &str, color: Color) {
    let _ = execute!(
        io::stdout(),
        SetForegroundColor(color),
        Print(text),
        ResetColor
    );
}

/// Print a dimmed line
fn print_dim(text: &str) {
    print_colored(&format!("{}\n", text), Color::DarkGrey);
}

/// Print an error message
fn print_error(text: &str) {
    print_colored(&format!("{}\n", text), Color::Red);
}

/// Print the welcome banner
fn print_banner(name: &str, model: &str) {
    let rule = "=".repeat(44);
    println!();
    print_colored(&format!("  {}\n", rule), Color::Cyan);
    print_colored(&format!("   {:^40}\n", format!("{} v{}", name.to_uppercase(), crate::VERSION)), Color::Cyan);
    print_colored(&format!("   {:^40}\n", "personal desktop assistant"), Color::Cyan);
    print_colored(&format!("  {}\n", rule), Color::Cyan);
    println!("  \x1b[90mmodel\x1b[0m    \x1b[36m{}\x1b[0m", model);
    println!();
}

fn print_reply(name: &str, text: &str) {
    print_colored(&format!("{}: ", name), Color::Green);
    println!("{}", text);
}

/// `quit` or `exit`, whole line, any case
pub fn is_quit(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}

/// Run the console assistant until quit, Ctrl-C or Ctrl-D
pub async fn run_console(config: Config, options: ConsoleOptions) -> Result<()> {
    let name = config.assistant.name.clone();

    let engine = SystemVoice::new(config.voice.tts_command.as_deref())?;
    let (speaker, speech_worker) = Speaker::spawn(Arc::new(engine))?;

    let vision = OllamaClient::new(&config.model.endpoint, &config.model.vision_model);
    let executor = ActionExecutor::new(Arc::new(DesktopTool::new()), Arc::new(vision), speaker.clone());
    let router = PersonaRouter::from_config(config.router.clone(), &config.model, None);
    let voice = VoiceMode::new(Arc::new(CloudListener::new(&config.voice)), executor.clone(), name.clone());
    let mut dispatcher = Dispatcher::new(config.assistant.clone(), router, executor.clone(), voice);

    print_banner(&name, &config.model.model);
    let greeting = format!("{} {} is now online.", config.assistant.greeting(), name);
    print_reply(&name, &greeting);
    speaker.speak(greeting);
    print_dim(&format!(
        "Commands: {p}amma (voice on), {p}appa (voice off), {p}demo, {p}talk, {p}open <app>, {p}look, {p}help. Type 'quit' to exit.",
        p = config.assistant.command_prefix
    ));
    if !options.no_hotkey {
        print_dim(&format!("Press {} anywhere to have {} look at your screen.", config.assistant.hotkey, name));
    }
    println!();

    let hotkey = if options.no_hotkey {
        None
    } else {
        match crate::tools::hotkey::spawn_listener(&config.assistant.hotkey, executor.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Hotkey disabled: {:#}", e);
                None
            }
        }
    };

    if options.voice {
        if let Ok(outcome) = dispatcher.dispatch(&format!("{}amma", config.assistant.command_prefix)).await {
            if let Some(text) = outcome.text() {
                print_reply(&name, text);
            }
        }
    }

    let result = console_loop(&mut dispatcher, &speaker, &name).await;

    // Wind down: voice loop, hotkey task, then drain the speech queue
    dispatcher.shutdown().await;
    if let Some(handle) = hotkey {
        handle.abort();
    }
    speaker.close();
    tokio::task::block_in_place(|| speech_worker.join());

    result
}

async fn console_loop(dispatcher: &mut Dispatcher, speaker: &Speaker, name: &str) -> Result<()> {
    let mut rl = rustyline::DefaultEditor::new().context("Failed to start line editor")?;
    let prompt = "\x1b[32mYou ❯\x1b[0m ".to_string();

    loop {
        let line = tokio::task::block_in_place(|| rl.readline(&prompt));

        let input = match line {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                farewell(speaker, name);
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to read input"),
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        if is_quit(input) {
            farewell(speaker, name);
            return Ok(());
        }

        match dispatcher.dispatch(input).await {
            Ok(Outcome::Answer { persona, text }) => {
                print_reply(name, &text);
                print_dim(&format!("[Model chosen: {}]", persona));
            }
            Ok(Outcome::Reply(text)) => print_reply(name, &text),
            Ok(Outcome::Silent) => {}
            Err(e) => print_error(&format!("Error: {:#}", e)),
        }
    }
}

fn farewell(speaker: &Speaker, name: &str) {
    let text = "Goodbye.";
    print_reply(name, text);
    speaker.speak(text);
}
