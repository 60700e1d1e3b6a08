//! One-shot speech capture
//!
//! `listen_once` records a fixed-length clip and turns it into text. Every
//! failure (no microphone, network trouble, nothing recognised) collapses
//! into `None`; the cause only reaches the debug log.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::audio;
use super::stt::CloudStt;
use crate::config::VoiceConfig;

/// Source of spoken commands
#[async_trait]
pub trait Listener: Send + Sync {
    /// Capture one utterance; `None` when nothing usable was heard
    async fn listen_once(&self) -> Option<String>;
}

/// Microphone capture plus cloud transcription
#[derive(Clone)]
pub struct CloudListener {
    stt: CloudStt,
    record_for: Duration,
}

impl CloudListener {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            stt: CloudStt::new(config),
            record_for: Duration::from_secs(config.record_secs.max(1)),
        }
    }

    async fn capture_and_transcribe(&self) -> anyhow::Result<String> {
        let secs = self.record_for.as_secs_f64();
        let clip = tokio::task::spawn_blocking(move || audio::record_duration(secs)).await??;
        if clip.is_empty() {
            anyhow::bail!("No audio captured");
        }
        self.stt.transcribe(clip.to_wav_bytes()?).await
    }
}

#[async_trait]
impl Listener for CloudListener {
    async fn listen_once(&self) -> Option<String> {
        match self.capture_and_transcribe().await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                debug!("listen_once failed: {:#}", e);
                None
            }
        }
    }
}
