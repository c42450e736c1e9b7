//! Playback-rate post-processing via ffmpeg's `atempo` filter.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::utilities::errors::SynthesisError;

/// Renders a stored audio artifact at a different playback speed.
#[async_trait]
pub trait AudioPostProcessor: Send + Sync + fmt::Debug {
    /// Write `input` played at `speed` to `output`. `input` is never modified.
    async fn change_tempo(
        &self,
        input: &Path,
        output: &Path,
        speed: f32,
    ) -> Result<(), SynthesisError>;
}

/// `ffmpeg`-backed tempo changer.
#[derive(Debug, Clone)]
pub struct FfmpegTempo {
    binary: PathBuf,
}

impl Default for FfmpegTempo {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegTempo {
    /// Use a specific ffmpeg binary.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl AudioPostProcessor for FfmpegTempo {
    async fn change_tempo(
        &self,
        input: &Path,
        output: &Path,
        speed: f32,
    ) -> Result<(), SynthesisError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(SynthesisError::Tool(format!("invalid speed {}", speed)));
        }

        let tmp = output.with_extension(format!("{}.tmp.mp3", uuid::Uuid::new_v4().simple()));
        let result = Command::new(&self.binary)
            .arg("-i")
            .arg(input)
            .arg("-filter:a")
            .arg(atempo_filter(speed))
            .arg("-y")
            .arg(&tmp)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !result.status.success() {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(SynthesisError::Tool(
                String::from_utf8_lossy(&result.stderr).trim().to_string(),
            ));
        }

        tokio::fs::rename(&tmp, output).await?;
        log::info!("Audio speed processed: {}, speed: {}", output.display(), speed);
        Ok(())
    }
}

/// Build an `atempo` chain. A single `atempo` stage only accepts factors in
/// `[0.5, 2.0]`, so larger changes are expressed as several stages.
pub fn atempo_filter(speed: f32) -> String {
    let mut remaining = speed;
    let mut stages = Vec::new();
    while remaining > 2.0 {
        stages.push("atempo=2.0".to_string());
        remaining /= 2.0;
    }
    while remaining < 0.5 {
        stages.push("atempo=0.5".to_string());
        remaining /= 0.5;
    }
    stages.push(format!("atempo={}", remaining));
    stages.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atempo_in_range() {
        assert_eq!(atempo_filter(1.25), "atempo=1.25");
        assert_eq!(atempo_filter(0.75), "atempo=0.75");
    }

    #[test]
    fn test_atempo_chains_out_of_range() {
        assert_eq!(atempo_filter(3.0), "atempo=2.0,atempo=1.5");
        assert_eq!(atempo_filter(0.25), "atempo=0.5,atempo=0.5");
    }

    #[tokio::test]
    async fn test_missing_binary_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.mp3");
        tokio::fs::write(&file, b"data").await.unwrap();

        let out = dir.path().join("a_x1.50.mp3");

        let tempo = FfmpegTempo::with_binary("/nonexistent/ffmpeg-binary");
        assert!(tempo.change_tempo(&file, &out, 1.5).await.is_err());
        assert_eq!(tokio::fs::read(&file).await.unwrap(), b"data");
        assert!(!out.exists());
    }
}
