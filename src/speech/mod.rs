//! Speech output and voice input.
//!
//! - [`clean`] - markdown/URL stripping and length limits
//! - [`cache`] - fingerprinted at-most-once synthesis cache
//! - [`synthesizer`] - Google Translate TTS client
//! - [`tempo`] - ffmpeg playback-rate adjustment
//! - [`transcribe`] - WebM → WAV → text

pub mod cache;
pub mod clean;
pub mod synthesizer;
pub mod tempo;
pub mod transcribe;

pub use cache::{fingerprint, slow_for_speed, AudioRef, SpeechCache};
pub use clean::{clean_for_speech, truncate_for_speech};
pub use synthesizer::{GoogleTranslateTts, SpeechSynthesizer};
pub use tempo::{AudioPostProcessor, FfmpegTempo};
pub use transcribe::{Transcriber, VoiceInput};
