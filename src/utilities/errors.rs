//! Error types for the assistant's external capabilities.
//!
//! None of these escape a chat turn: the orchestrator and speech cache
//! convert them into fallback text or "no audio". They exist so each
//! collaborator can report *why* it failed for logging.

use thiserror::Error;

/// Failures of the reply generation capability (Gemini).
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No API key configured.
    #[error("Generation API key not set (GOOGLE_API_KEY)")]
    MissingApiKey,

    /// Transport-level failure.
    #[error("Generation HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("Generation API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("Malformed generation response: {0}")]
    Malformed(String),

    /// The model answered with no text.
    #[error("Empty reply from generation API")]
    Empty,

    /// The call exceeded the configured bound.
    #[error("Generation timed out after {0}s")]
    Timeout(u64),
}

/// Failures of speech synthesis or audio post-processing.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Transport-level failure.
    #[error("Synthesis HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("Synthesis API returned {0}")]
    Status(u16),

    /// Nothing left to speak after cleaning.
    #[error("Nothing to synthesize")]
    EmptyText,

    /// File I/O error while storing or processing an artifact.
    #[error("Audio IO error: {0}")]
    Io(#[from] std::io::Error),

    /// External audio tool failed.
    #[error("Audio tool failed: {0}")]
    Tool(String),
}

/// Failures of voice transcription.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// ffmpeg is not installed or not runnable.
    #[error("FFmpeg is not available on this server")]
    FfmpegUnavailable,

    /// WebM → WAV conversion failed.
    #[error("Failed to convert audio format: {0}")]
    Conversion(String),

    /// File I/O error.
    #[error("Audio IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The speech-to-text call itself failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Failures of map lookups.
#[derive(Debug, Error)]
pub enum MapsError {
    /// TomTom key absent.
    #[error("TomTom API key is not configured")]
    MissingApiKey,

    /// Transport-level failure.
    #[error("Maps HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("Maps API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Configured base URL cannot carry path segments.
    #[error("Invalid maps base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Invalid startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    Invalid { name: &'static str, value: String },
}
