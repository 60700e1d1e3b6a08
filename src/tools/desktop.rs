//! Desktop control for the assistant's actions
//!
//! Provides capabilities for:
//! - Screen capture (PNG bytes for the vision model)
//! - Mouse control (move, click, scroll, demo wiggle)
//! - Keyboard typing
//! - Application launching
//!
//! Mouse, keyboard and screen access need the `desktop` feature; without
//! it those calls fail with an error instead of panicking.

#[cfg(feature = "desktop")]
use anyhow::Context;
use anyhow::{Result, bail};
#[cfg(feature = "desktop")]
use image::ImageBuffer;

/// Where "click" lands when no coordinates are given
pub const CENTER: (i32, i32) = (960, 540);

/// Wheel notches for one "scroll" action; negative scrolls down
pub const SCROLL_STEP: i32 = -10;

/// How far the demo wiggle moves the cursor
pub const WIGGLE_OFFSET: i32 = 50;

/// OS automation primitives the assistant drives
///
/// Calls block until the OS has accepted the input; callers on the
/// async runtime should hop to a blocking thread first.
pub trait DesktopActions: Send + Sync {
    fn open_application(&self, name: &str) -> Result<()>;

    /// Type `text` exactly as given
    fn type_text(&self, text: &str) -> Result<()>;

    /// Move to absolute `(x, y)` and left-click
    fn click_at(&self, x: i32, y: i32) -> Result<()>;

    /// Scroll vertically by `amount` notches (negative is down)
    fn scroll(&self, amount: i32) -> Result<()>;

    /// Nudge the cursor right and back again
    fn wiggle_cursor(&self) -> Result<()>;

    /// Capture the primary screen as PNG bytes
    fn capture_screen(&self) -> Result<Vec<u8>>;
}

/// Desktop tool backed by enigo and screenshots
#[derive(Debug, Clone, Default)]
pub struct DesktopTool;

impl DesktopTool {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "desktop")]
fn enigo() -> Result<enigo::Enigo> {
    enigo::Enigo::new(&enigo::Settings::default()).context("Failed to create Enigo")
}

impl DesktopActions for DesktopTool {
    fn open_application(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("No application name given");
        }

        #[cfg(target_os = "linux")]
        {
            // Launch by executable name; fall back to the desktop's opener
            if std::process::Command::new(name).spawn().is_err() {
                std::process::Command::new("xdg-open")
                    .arg(name)
                    .spawn()
                    .map_err(|e| anyhow::anyhow!("Failed to launch {}: {}", name, e))?;
            }
        }

        #[cfg(target_os = "macos")]
        {
            std::process::Command::new("open")
                .arg("-a")
                .arg(name)
                .spawn()
                .map_err(|e| anyhow::anyhow!("Failed to launch {}: {}", name, e))?;
        }

        #[cfg(target_os = "windows")]
        {
            // Empty title argument so a quoted name is not taken as the window title
            std::process::Command::new("cmd")
                .args(["/C", "start", "", name])
                .spawn()
                .map_err(|e| anyhow::anyhow!("Failed to launch {}: {}", name, e))?;
        }

        tracing::debug!("Launched application {}", name);
        Ok(())
    }

    fn type_text(&self, text: &str) -> Result<()> {
        #[cfg(feature = "desktop")]
        {
            use enigo::Keyboard;
            enigo()?.text(text).context("Failed to type text")?;
            return Ok(());
        }
        #[cfg(not(feature = "desktop"))]
        {
            let _ = text;
            bail!("Desktop features not enabled. Build with --features desktop")
        }
    }

    fn click_at(&self, x: i32, y: i32) -> Result<()> {
        #[cfg(feature = "desktop")]
        {
            use enigo::{Button, Coordinate, Direction, Mouse};
            let mut enigo = enigo()?;
            enigo.move_mouse(x, y, Coordinate::Abs).context("Failed to move mouse")?;
            enigo.button(Button::Left, Direction::Click).context("Failed to click")?;
            return Ok(());
        }
        #[cfg(not(feature = "desktop"))]
        {
            let _ = (x, y);
            bail!("Desktop features not enabled. Build with --features desktop")
        }
    }

    fn scroll(&self, amount: i32) -> Result<()> {
        #[cfg(feature = "desktop")]
        {
            use enigo::{Axis, Mouse};
            // enigo counts positive as down
            enigo()?.scroll(-amount, Axis::Vertical).context("Failed to scroll")?;
            return Ok(());
        }
        #[cfg(not(feature = "desktop"))]
        {
            let _ = amount;
            bail!("Desktop features not enabled. Build with --features desktop")
        }
    }

    fn wiggle_cursor(&self) -> Result<()> {
        #[cfg(feature = "desktop")]
        {
            use enigo::{Coordinate, Mouse};
            let mut enigo = enigo()?;
            let (x, y) = enigo.location().context("Failed to read cursor position")?;
            enigo.move_mouse(x + WIGGLE_OFFSET, y, Coordinate::Abs).context("Failed to move mouse")?;
            std::thread::sleep(std::time::Duration::from_millis(300));
            enigo.move_mouse(x, y, Coordinate::Abs).context("Failed to move mouse")?;
            return Ok(());
        }
        #[cfg(not(feature = "desktop"))]
        bail!("Desktop features not enabled. Build with --features desktop")
    }

    fn capture_screen(&self) -> Result<Vec<u8>> {
        #[cfg(feature = "desktop")]
        {
            use screenshots::Screen;

            let screens = Screen::all().context("Failed to get screen list")?;
            let screen = screens.into_iter().next().context("No screens found")?;
            let image = screen.capture().context("Failed to capture screenshot")?;

            let width = image.width();
            let height = image.height();
            let img_buffer: ImageBuffer<image::Rgba<u8>, Vec<u8>> =
                ImageBuffer::from_raw(width, height, image.as_raw().clone())
                    .context("Failed to create image buffer")?;

            let mut png_bytes: Vec<u8> = Vec::new();
            img_buffer
                .write_to(&mut std::io::Cursor::new(&mut png_bytes), image::ImageFormat::Png)
                .context("Failed to encode screenshot as PNG")?;

            tracing::debug!("Captured {}x{} screenshot ({} bytes)", width, height, png_bytes.len());
            return Ok(png_bytes);
        }
        #[cfg(not(feature = "desktop"))]
        bail!("Desktop features not enabled. Build with --features desktop")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_requires_name() {
        let err = DesktopTool::new().open_application("   ").unwrap_err();
        assert!(err.to_string().contains("No application name"));
    }
}
