//! Voice input: browser WebM recording → 16 kHz mono WAV → text.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::utilities::errors::{GenerationError, TranscriptionError};

/// Speech-to-text collaborator.
#[async_trait]
pub trait Transcriber: Send + Sync + fmt::Debug {
    /// Transcribe a WAV recording.
    async fn transcribe(&self, wav: &[u8]) -> Result<String, GenerationError>;
}

/// Converts uploaded recordings with ffmpeg and hands them to a
/// [`Transcriber`].
#[derive(Debug, Clone)]
pub struct VoiceInput {
    ffmpeg: PathBuf,
    transcriber: Arc<dyn Transcriber>,
}

impl VoiceInput {
    /// Use `ffmpeg` from `PATH`.
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            transcriber,
        }
    }

    /// Use a specific ffmpeg binary.
    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    /// Whether ffmpeg can be executed.
    pub async fn ffmpeg_available(&self) -> bool {
        let status = Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(s) if s.success() => true,
            _ => {
                log::warn!("FFmpeg is not available. Audio conversion will not work.");
                false
            }
        }
    }

    /// Convert WebM bytes to 16 kHz mono WAV bytes.
    pub async fn webm_to_wav(&self, webm: &[u8]) -> Result<Vec<u8>, TranscriptionError> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.webm");
        let output = dir.path().join("output.wav");
        tokio::fs::write(&input, webm).await?;

        log::info!("Converting WebM ({} bytes) to WAV", webm.len());
        let result = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(&input)
            .args(["-ar", "16000", "-ac", "1", "-y"])
            .arg(&output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TranscriptionError::Conversion(e.to_string()))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            log::error!("FFmpeg stderr: {}", stderr.trim());
            return Err(TranscriptionError::Conversion(format!(
                "ffmpeg exited with {}",
                result.status
            )));
        }

        Ok(tokio::fs::read(&output).await?)
    }

    /// Full pipeline. Scratch files are removed when the temp dir drops.
    pub async fn transcribe_webm(&self, webm: &[u8]) -> Result<String, TranscriptionError> {
        if !self.ffmpeg_available().await {
            return Err(TranscriptionError::FfmpegUnavailable);
        }
        let wav = self.webm_to_wav(webm).await?;
        log::info!("WAV file created, size: {} bytes", wav.len());
        Ok(self.transcriber.transcribe(&wav).await?)
    }
}
