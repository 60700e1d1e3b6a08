//! Spoken output through a FIFO queue
//!
//! ```text
//! speak("A") ─┐
//! speak("B") ─┼─> unbounded queue ─> worker thread ─> SpeechEngine
//! close()    ─┘      (Say / Stop)      (one job at a time)
//! ```
//!
//! Each job is rendered to completion before the next is taken. There is no
//! priority and no interruption of speech in progress. `close` queues a
//! `Stop` behind everything already waiting, so closing drains the queue.

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Something that can say a line out loud, blocking until done
pub trait SpeechEngine: Send + Sync {
    fn speak(&self, text: &str) -> Result<()>;
}

/// Work item for the speech worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechJob {
    Say(String),
    Stop,
}

/// Handle for queueing speech; cheap to clone
#[derive(Clone)]
pub struct Speaker {
    tx: mpsc::UnboundedSender<SpeechJob>,
}

/// The worker thread behind a `Speaker`
pub struct SpeechWorker {
    handle: std::thread::JoinHandle<()>,
}

impl Speaker {
    /// Start the worker thread for `engine`
    pub fn spawn(engine: Arc<dyn SpeechEngine>) -> Result<(Speaker, SpeechWorker)> {
        let (tx, mut rx) = mpsc::unbounded_channel::<SpeechJob>();

        let handle = std::thread::Builder::new()
            .name("speech".to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    match job {
                        SpeechJob::Say(text) => {
                            debug!("Speaking {} chars", text.len());
                            if let Err(e) = engine.speak(&text) {
                                warn!("Speech failed: {:#}", e);
                            }
                        }
                        SpeechJob::Stop => break,
                    }
                }
            })
            .context("Failed to start speech worker")?;

        Ok((Speaker { tx }, SpeechWorker { handle }))
    }

    /// A speaker whose queue goes nowhere (for one-shot commands and tests)
    pub fn silent() -> Speaker {
        let (tx, _rx) = mpsc::unbounded_channel();
        Speaker { tx }
    }

    /// Queue `text`; blank lines are skipped
    pub fn speak(&self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        // A closed queue means the session is shutting down
        let _ = self.tx.send(SpeechJob::Say(text));
    }

    /// Ask the worker to stop after everything already queued
    pub fn close(&self) {
        let _ = self.tx.send(SpeechJob::Stop);
    }
}

impl SpeechWorker {
    /// Wait for the worker to finish the queue
    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("Speech worker panicked");
        }
    }
}

/// Speech through the platform's command-line voice
#[derive(Debug, Clone)]
pub struct SystemVoice {
    program: String,
    args: Vec<String>,
    /// Double single quotes in the text (PowerShell string literal)
    quote: bool,
}

impl SystemVoice {
    /// Use `command` when given, otherwise the platform default
    ///
    /// The text replaces a `{text}` placeholder in the arguments, or is
    /// appended as the last argument when there is none. Arguments go to the
    /// program as-is with no shell in between, so the placeholder must not
    /// be quoted.
    pub fn new(command: Option<&str>) -> Result<Self> {
        match command {
            Some(cmd) => Self::from_command_line(cmd),
            None => Ok(Self::platform_default()),
        }
    }

    fn from_command_line(cmd: &str) -> Result<Self> {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let Some(program) = parts.next() else {
            bail!("Empty speech command");
        };
        Ok(Self { program, args: parts.collect(), quote: false })
    }

    #[cfg(target_os = "macos")]
    fn platform_default() -> Self {
        Self { program: "say".to_string(), args: Vec::new(), quote: false }
    }

    #[cfg(target_os = "windows")]
    fn platform_default() -> Self {
        Self::powershell()
    }

    /// System.Speech through PowerShell; the text sits inside a '...' literal
    #[cfg(any(target_os = "windows", test))]
    fn powershell() -> Self {
        Self {
            program: "powershell".to_string(),
            args: vec![
                "-NoProfile".to_string(),
                "-Command".to_string(),
                "Add-Type -AssemblyName System.Speech; \
                 (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{text}')".to_string(),
            ],
            quote: true,
        }
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn platform_default() -> Self {
        Self { program: "espeak".to_string(), args: Vec::new(), quote: false }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn args_for(&self, text: &str) -> Vec<String> {
        if self.args.iter().any(|a| a.contains(TEXT_PLACEHOLDER)) {
            let text = if self.quote { text.replace('\'', "''") } else { text.to_string() };
            self.args.iter().map(|a| a.replace(TEXT_PLACEHOLDER, &text)).collect()
        } else {
            let mut args = self.args.clone();
            args.push(text.to_string());
            args
        }
    }
}

const TEXT_PLACEHOLDER: &str = "{text}";

impl SpeechEngine for SystemVoice {
    fn speak(&self, text: &str) -> Result<()> {
        let status = std::process::Command::new(&self.program)
            .args(self.args_for(text))
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .with_context(|| format!("Failed to run {}", self.program))?;
        if !status.success() {
            bail!("{} exited with {}", self.program, status);
        }
        Ok(())
    }
}
