//! Global hotkey that triggers a screen look
//!
//! rdev's `listen` blocks its thread forever, so it runs on a dedicated
//! OS thread and forwards matching key presses over a channel to a task
//! on the runtime. Presses that arrive while a look is still running are
//! collapsed into nothing.

use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::agent::actions::ActionExecutor;

/// Run `on_press` once per press, dropping presses that queued up meanwhile
pub async fn drive_presses<F, Fut>(mut presses: mpsc::UnboundedReceiver<()>, mut on_press: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    while presses.recv().await.is_some() {
        on_press().await;
        while presses.try_recv().is_ok() {}
    }
}

/// Start the hotkey listener; each press runs look-and-speak
pub fn spawn_listener(hotkey: &str, executor: ActionExecutor) -> anyhow::Result<JoinHandle<()>> {
    let presses = listen_for(hotkey)?;
    tracing::info!("Hotkey listener armed on {}", hotkey);

    Ok(tokio::spawn(async move {
        drive_presses(presses, || {
            let executor = executor.clone();
            async move {
                println!("\n[Hotkey] Looking at the screen...");
                let description = executor.look_and_speak().await;
                println!("{}", description);
            }
        })
        .await;
    }))
}

#[cfg(feature = "desktop")]
fn listen_for(hotkey: &str) -> anyhow::Result<mpsc::UnboundedReceiver<()>> {
    use rdev::{listen, Event, EventType};

    let target = parse_hotkey(hotkey)
        .ok_or_else(|| anyhow::anyhow!("Unsupported hotkey: {}", hotkey))?;
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("hotkey".to_string())
        .spawn(move || {
            let callback = move |event: Event| {
                if let EventType::KeyPress(key) = event.event_type {
                    if key == target {
                        let _ = tx.send(());
                    }
                }
            };
            if let Err(e) = listen(callback) {
                tracing::warn!("Hotkey listener stopped: {:?}", e);
            }
        })?;

    Ok(rx)
}

#[cfg(not(feature = "desktop"))]
fn listen_for(_hotkey: &str) -> anyhow::Result<mpsc::UnboundedReceiver<()>> {
    anyhow::bail!("Desktop features not enabled. Build with --features desktop")
}

/// Parse a hotkey name into an rdev key
#[cfg(feature = "desktop")]
pub fn parse_hotkey(s: &str) -> Option<rdev::Key> {
    use rdev::Key;

    match s.trim().to_uppercase().as_str() {
        "F1" => Some(Key::F1),
        "F2" => Some(Key::F2),
        "F3" => Some(Key::F3),
        "F4" => Some(Key::F4),
        "F5" => Some(Key::F5),
        "F6" => Some(Key::F6),
        "F7" => Some(Key::F7),
        "F8" => Some(Key::F8),
        "F9" => Some(Key::F9),
        "F10" => Some(Key::F10),
        "F11" => Some(Key::F11),
        "F12" => Some(Key::F12),
        "SCROLLLOCK" | "SCROLL_LOCK" => Some(Key::ScrollLock),
        "PAUSE" => Some(Key::Pause),
        "PRINTSCREEN" | "PRTSC" => Some(Key::PrintScreen),
        "INSERT" => Some(Key::Insert),
        "HOME" => Some(Key::Home),
        "END" => Some(Key::End),
        _ => None,
    }
}
