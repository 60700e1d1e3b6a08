//! Saba - Voice Module
//!
//! Speech in and out:
//! - Speaker (FIFO speech queue with one worker thread)
//! - Audio capture (microphone, WAV encoding)
//! - Cloud transcription (OpenAI-compatible endpoint)
//! - Listener (`listen_once`)
//! - Voice mode (the continuous listening loop)

pub mod audio;
pub mod listener;
pub mod mode;
pub mod speaker;
pub mod stt;

pub use listener::{CloudListener, Listener};
pub use mode::VoiceMode;
pub use speaker::{Speaker, SpeechEngine, SpeechJob, SpeechWorker, SystemVoice};
