//! Continuous voice mode
//!
//! At most one listening loop runs at a time. Each loop gets its own
//! cancellation token at spawn time and checks it before every capture
//! cycle. Stopping never interrupts a capture already in progress; a
//! transcript that arrives after cancellation is discarded.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::listener::Listener;
use crate::agent::actions::ActionExecutor;
use crate::agent::command::parse_natural;

/// Pause after a capture that produced no text
const RETRY_PAUSE: Duration = Duration::from_millis(500);

struct ActiveLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Start/stop control for the listening loop
pub struct VoiceMode {
    listener: Arc<dyn Listener>,
    executor: ActionExecutor,
    name: String,
    active: Option<ActiveLoop>,
    retired: Vec<JoinHandle<()>>,
    spawned: usize,
}

impl VoiceMode {
    pub fn new(listener: Arc<dyn Listener>, executor: ActionExecutor, name: impl Into<String>) -> Self {
        Self {
            listener,
            executor,
            name: name.into(),
            active: None,
            retired: Vec::new(),
            spawned: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Number of loops started over this controller's lifetime
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Start listening; `false` when a loop is already running
    ///
    /// A loop stopped moments ago may still be inside a capture; the new
    /// loop waits for it to finish before touching the microphone.
    pub fn start(&mut self) -> bool {
        if self.active.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let previous = std::mem::take(&mut self.retired);
        let handle = tokio::spawn(listen_loop(
            self.listener.clone(),
            self.executor.clone(),
            self.name.clone(),
            cancel.clone(),
            previous,
        ));
        self.active = Some(ActiveLoop { cancel, handle });
        self.spawned += 1;
        debug!("Voice loop #{} started", self.spawned);
        true
    }

    /// Stop listening; `false` when nothing was running
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                active.cancel.cancel();
                self.retired.push(active.handle);
                true
            }
            None => false,
        }
    }

    /// Stop and wait for every loop to wind down
    pub async fn shutdown(&mut self) {
        self.stop();
        for handle in self.retired.drain(..) {
            if let Err(e) = handle.await {
                warn!("Voice loop ended abnormally: {}", e);
            }
        }
    }
}

async fn listen_loop(
    listener: Arc<dyn Listener>,
    executor: ActionExecutor,
    name: String,
    cancel: CancellationToken,
    previous: Vec<JoinHandle<()>>,
) {
    for handle in previous {
        if let Err(e) = handle.await {
            warn!("Voice loop ended abnormally: {}", e);
        }
    }

    println!("Voice mode ON: {} is listening...", name);

    while !cancel.is_cancelled() {
        println!("\n[Listening...]");
        let heard = listener.listen_once().await;
        if cancel.is_cancelled() {
            break;
        }
        let Some(text) = heard else {
            // Nothing usable heard; pause so a dead microphone does not spin
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(RETRY_PAUSE) => {}
            }
            continue;
        };

        println!("[Voice heard]: {}", text);
        let Some(action) = parse_natural(&text, &name) else {
            continue;
        };

        match executor.run_natural(action).await {
            Ok(Some(reply)) => {
                println!("{}: {}", name, reply);
                executor.speaker().speak(reply);
            }
            Ok(None) => {}
            Err(e) => println!("{}: action failed: {:#}", name, e),
        }
    }

    println!("Voice mode OFF.");
}
