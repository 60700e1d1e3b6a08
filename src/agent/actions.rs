//! Desktop actions the assistant performs on request
//!
//! Wraps the OS automation primitives, the vision model and the speech
//! queue behind one cloneable handle shared by the console dispatcher,
//! the voice loop and the hotkey listener.

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use super::command::NaturalAction;
use super::llm::VisionBackend;
use crate::tools::desktop::{DesktopActions, CENTER, SCROLL_STEP};
use crate::voice::speaker::Speaker;

/// Prompt sent with every screenshot
pub const LOOK_PROMPT: &str = "Describe what you see on my screen.";

#[derive(Clone)]
pub struct ActionExecutor {
    desktop: Arc<dyn DesktopActions>,
    vision: Arc<dyn VisionBackend>,
    speaker: Speaker,
}

impl ActionExecutor {
    pub fn new(desktop: Arc<dyn DesktopActions>, vision: Arc<dyn VisionBackend>, speaker: Speaker) -> Self {
        Self { desktop, vision, speaker }
    }

    pub fn speaker(&self) -> &Speaker {
        &self.speaker
    }

    /// Run a desktop call on the blocking pool
    async fn desktop<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DesktopActions) -> Result<T> + Send + 'static,
    {
        let desktop = self.desktop.clone();
        tokio::task::spawn_blocking(move || f(desktop.as_ref())).await?
    }

    pub async fn open_application(&self, app: &str) -> Result<String> {
        let name = app.to_string();
        self.desktop(move |d| d.open_application(&name)).await?;
        Ok(format!("Opening {}...", app))
    }

    /// Cursor wiggle used by `/demo`
    pub async fn demo(&self) -> Result<String> {
        self.desktop(|d| d.wiggle_cursor()).await?;
        Ok("Demo action executed.".to_string())
    }

    /// Perform a natural action; `None` for a verb missing its argument
    pub async fn run_natural(&self, action: NaturalAction) -> Result<Option<String>> {
        let reply = match action {
            NaturalAction::Open(app) => self.open_application(&app).await?,
            NaturalAction::Type(text) => {
                let literal = text.clone();
                self.desktop(move |d| d.type_text(&literal)).await?;
                format!("Typing: {}", text)
            }
            NaturalAction::Click => {
                self.desktop(|d| d.click_at(CENTER.0, CENTER.1)).await?;
                "Clicking the center.".to_string()
            }
            NaturalAction::Scroll => {
                self.desktop(|d| d.scroll(SCROLL_STEP)).await?;
                "Scrolling down.".to_string()
            }
            // Acknowledged only; no search destination is wired up
            NaturalAction::Search(query) => format!("Searching for {}...", query),
            NaturalAction::Look => self.look(LOOK_PROMPT).await,
            NaturalAction::Incomplete(verb) => {
                tracing::debug!("Natural action '{}' missing its argument", verb);
                return Ok(None);
            }
        };
        Ok(Some(reply))
    }

    /// Capture the screen and describe it; failures become an apology
    pub async fn look(&self, prompt: &str) -> String {
        let image = match self.desktop(|d| d.capture_screen()).await {
            Ok(png) => png,
            Err(e) => {
                warn!("Screen capture failed: {:#}", e);
                return format!("I could not capture the screen: {}", e);
            }
        };

        match self.vision.analyze_image(&image, prompt).await {
            Ok(description) => description,
            Err(e) => {
                warn!("Vision request failed: {}", e);
                format!("I had an issue analyzing the screen: {}", e)
            }
        }
    }

    /// `look` with the default prompt, spoken as well as returned
    pub async fn look_and_speak(&self) -> String {
        let description = self.look(LOOK_PROMPT).await;
        self.speaker.speak(description.clone());
        description
    }
}
