//! Cloud speech-to-text over an OpenAI-compatible `/audio/transcriptions` API

use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::config::VoiceConfig;

/// Upper bound on one transcription round-trip
const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Transcription client
#[derive(Clone)]
pub struct CloudStt {
    client: Client,
    url: String,
    model: String,
    language: String,
    api_key: String,
}

impl CloudStt {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.stt_url.clone(),
            model: config.stt_model.clone(),
            language: config.language.clone(),
            api_key: config.stt_api_key.clone(),
        }
    }

    /// Upload a WAV clip and return the recognised text, trimmed
    pub async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "json")
            .part("file", reqwest::multipart::Part::bytes(wav)
                .file_name("speech.wav")
                .mime_str("audio/wav")?);

        let mut request = self.client
            .post(&self.url)
            .timeout(TRANSCRIBE_TIMEOUT)
            .multipart(form);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await
            .context("Failed to reach transcription service")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Transcription service returned {}: {}", status, crate::truncate_safe(&body, 200));
        }

        let parsed: TranscriptionResponse = response.json().await
            .context("Failed to parse transcription response")?;
        debug!("Transcribed {} chars", parsed.text.len());
        Ok(parsed.text.trim().to_string())
    }
}
