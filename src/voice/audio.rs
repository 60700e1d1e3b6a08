//! Microphone capture and WAV encoding
//!
//! - cpal: fixed-duration capture from the default input device
//! - hound: in-memory WAV encoding for the transcription upload
//!
//! Capture runs at whatever rate and channel count the device prefers and
//! is then folded down to 16 kHz mono, which is what speech models expect.

use anyhow::{Context, Result};
use std::io::Cursor;

/// Sample rate sent to the transcription service
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Captured audio, interleaved f32 samples
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Create from raw samples
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Get samples as i16 (for WAV export)
    pub fn samples_i16(&self) -> Vec<i16> {
        self.samples.iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect()
    }

    /// Get buffer duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Average the channels of each frame into one
    pub fn to_mono(&self) -> Self {
        if self.channels == 1 {
            return self.clone();
        }
        let channels = self.channels as usize;
        let samples = self.samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        Self::from_samples(samples, self.sample_rate, 1)
    }

    /// Resample to a different sample rate (simple linear interpolation)
    pub fn resample(&self, target_rate: u32) -> Self {
        if self.sample_rate == target_rate || self.samples.is_empty() {
            return Self::from_samples(self.samples.clone(), target_rate, self.channels);
        }

        let ratio = target_rate as f64 / self.sample_rate as f64;
        let new_len = (self.samples.len() as f64 * ratio) as usize;
        let last = self.samples.len() - 1;
        let mut new_samples = Vec::with_capacity(new_len);

        for i in 0..new_len {
            let src_idx = i as f64 / ratio;
            let idx_floor = (src_idx.floor() as usize).min(last);
            let idx_ceil = (idx_floor + 1).min(last);
            let frac = (src_idx - idx_floor as f64) as f32;

            new_samples.push(self.samples[idx_floor] * (1.0 - frac) + self.samples[idx_ceil] * frac);
        }

        Self::from_samples(new_samples, target_rate, self.channels)
    }

    /// Encode as a 16-bit PCM WAV file in memory
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .context("Failed to start WAV encoding")?;
            for sample in self.samples_i16() {
                writer.write_sample(sample)?;
            }
            writer.finalize().context("Failed to finish WAV encoding")?;
        }
        Ok(cursor.into_inner())
    }
}

/// Record from the default microphone for `duration_secs`, as 16 kHz mono
#[cfg(feature = "voice")]
pub fn record_duration(duration_secs: f64) -> Result<AudioBuffer> {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::sync::{Arc, Mutex};

    let host = cpal::default_host();
    let device = host.default_input_device()
        .context("No input device available (microphone not found)")?;
    let supported = device.default_input_config()
        .context("Failed to get default input config")?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let stream_config: cpal::StreamConfig = supported.config();
    tracing::debug!("Recording {}s at {}Hz, {} channels", duration_secs, sample_rate, channels);

    let collected: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let err_fn = |err| tracing::error!("Audio input error: {}", err);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            let sink = collected.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                err_fn,
                None,
            )?
        }
        cpal::SampleFormat::I16 => {
            let sink = collected.clone();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend(data.iter().map(|&s| s as f32 / i16::MAX as f32));
                    }
                },
                err_fn,
                None,
            )?
        }
        format => anyhow::bail!("Unsupported sample format: {:?}", format),
    };

    stream.play().context("Failed to start microphone stream")?;
    std::thread::sleep(std::time::Duration::from_secs_f64(duration_secs));
    drop(stream);

    let samples = collected.lock()
        .map(|s| s.clone())
        .unwrap_or_default();
    let buffer = AudioBuffer::from_samples(samples, sample_rate, channels);
    Ok(buffer.to_mono().resample(DEFAULT_SAMPLE_RATE))
}

#[cfg(not(feature = "voice"))]
pub fn record_duration(_duration_secs: f64) -> Result<AudioBuffer> {
    anyhow::bail!("Voice features not enabled. Build with --features voice")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_i16_clamps() {
        let buffer = AudioBuffer::from_samples(vec![0.5, 2.0, -2.0], 16000, 1);
        let pcm = buffer.samples_i16();
        assert_eq!(pcm[0], (0.5 * i16::MAX as f32) as i16);
        assert_eq!(pcm[1], i16::MAX);
        assert_eq!(pcm[2], -i16::MAX);
    }

    #[test]
    fn test_to_mono_averages_frames() {
        let stereo = AudioBuffer::from_samples(vec![1.0, 0.0, 0.5, 0.5], 48000, 2);
        let mono = stereo.to_mono();
        assert_eq!(mono.channels(), 1);
        assert_eq!(mono.samples(), &[0.5, 0.5]);
    }

    #[test]
    fn test_resample_duration_is_kept() {
        let buffer = AudioBuffer::from_samples(vec![0.1; 48000], 48000, 1);
        let resampled = buffer.resample(DEFAULT_SAMPLE_RATE);
        assert_eq!(resampled.sample_rate(), DEFAULT_SAMPLE_RATE);
        assert_eq!(resampled.samples().len(), 16000);
        assert!((resampled.duration_secs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wav_bytes_are_readable() {
        let buffer = AudioBuffer::from_samples(vec![0.0, 0.25, -0.25, 0.0], 16000, 1);
        let bytes = buffer.to_wav_bytes().unwrap();
        assert_eq!(&bytes[..4], b"RIFF");

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.channels, 1);
        assert_eq!(reader.len(), 4);
    }
}
