//! Content-addressed speech cache.
//!
//! Maps a fingerprint of `(cleaned text, language, slow)` to an MP3 file
//! under the public cache directory. Each fingerprint owns an async
//! once-cell, so concurrent misses for the same reply run exactly one
//! synthesis and every waiter receives the same [`AudioRef`].
//!
//! ```text
//! text ─ clean ─ fingerprint ─┬─ hit  → AudioRef
//!                             └─ miss → truncate → synthesize → store → AudioRef
//! ```
//!
//! A non-default speed renders a separate `{fingerprint}_x{speed}.mp3`
//! from the base artifact, single-flighted the same way. The base file is
//! written once and never modified.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use md5::{Digest, Md5};
use serde::Serialize;
use tokio::sync::OnceCell;

use super::clean::{clean_for_speech, truncate_for_speech, MAX_SPEECH_CHARS};
use super::synthesizer::SpeechSynthesizer;
use super::tempo::AudioPostProcessor;
use crate::utilities::errors::SynthesisError;

/// Speeds below this select the slow voice.
pub const SLOW_SPEED_THRESHOLD: f32 = 1.0;

/// Whether a requested playback speed maps to the slow synthesis voice.
pub fn slow_for_speed(speed: f32) -> bool {
    speed < SLOW_SPEED_THRESHOLD
}

/// Stable cache key for already-cleaned text.
pub fn fingerprint(cleaned_text: &str, language: &str, slow: bool) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("{}_{}_{}", cleaned_text, language, slow).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Reference to a stored audio artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioRef {
    /// Cache key the artifact is stored under.
    pub fingerprint: String,
    /// Location on disk.
    #[serde(skip)]
    pub path: PathBuf,
    /// Public URL the browser can fetch.
    pub url: String,
}

/// Speech cache with at-most-once synthesis per fingerprint.
#[derive(Debug, Clone)]
pub struct SpeechCache {
    dir: PathBuf,
    public_prefix: String,
    max_chars: usize,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    post_processor: Option<Arc<dyn AudioPostProcessor>>,
    entries: Arc<DashMap<String, Arc<OnceCell<AudioRef>>>>,
}

impl SpeechCache {
    /// Create a cache storing files in `dir`, served under `public_prefix`.
    pub fn new(
        dir: impl Into<PathBuf>,
        public_prefix: impl Into<String>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
            max_chars: MAX_SPEECH_CHARS,
            synthesizer,
            post_processor: None,
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Attach a tempo post-processor for non-default speeds.
    pub fn with_post_processor(mut self, post: Arc<dyn AudioPostProcessor>) -> Self {
        self.post_processor = Some(post);
        self
    }

    /// Override the synthesis length limit.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Directory holding the artifacts.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of artifacts (base and speed variants) resolved in this process.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.value().initialized())
            .count()
    }

    /// Whether no fingerprint has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return cached speech for `text`, synthesizing it on a miss.
    ///
    /// Never fails: any synthesis or storage error is logged and yields
    /// `None`, which callers treat as "no audio".
    pub async fn synthesize(
        &self,
        text: &str,
        language: &str,
        slow: bool,
        speed: f32,
    ) -> Option<AudioRef> {
        let cleaned = clean_for_speech(text);
        if cleaned.is_empty() {
            log::debug!("Nothing to speak after cleaning; skipping synthesis");
            return None;
        }

        let key = fingerprint(&cleaned, language, slow);
        let base = match self
            .cell(&key)
            .get_or_try_init(|| self.populate(&key, &cleaned, language, slow))
            .await
        {
            Ok(audio) => audio.clone(),
            Err(e) => {
                log::error!("Speech synthesis failed for {}: {}", key, e);
                return None;
            }
        };

        match &self.post_processor {
            Some(post) if (speed - 1.0).abs() > f32::EPSILON => {
                Some(self.with_tempo(post.as_ref(), &base, speed).await)
            }
            _ => Some(base),
        }
    }

    /// Speed variant of `base`, rendered once per (fingerprint, speed).
    /// Falls back to `base` when post-processing fails.
    async fn with_tempo(
        &self,
        post: &dyn AudioPostProcessor,
        base: &AudioRef,
        speed: f32,
    ) -> AudioRef {
        let key = format!("{}_x{:.2}", base.fingerprint, speed);
        let cell = self.cell(&key);
        let result = cell
            .get_or_try_init(|| async {
                let variant = self.artifact(&key);
                if tokio::fs::try_exists(&variant.path).await.unwrap_or(false) {
                    return Ok(variant);
                }
                post.change_tempo(&base.path, &variant.path, speed).await?;
                Ok::<_, SynthesisError>(variant)
            })
            .await;

        match result {
            Ok(variant) => variant.clone(),
            Err(e) => {
                log::warn!(
                    "Tempo adjustment to {} failed for {}, keeping original audio: {}",
                    speed,
                    base.fingerprint,
                    e
                );
                base.clone()
            }
        }
    }

    fn cell(&self, key: &str) -> Arc<OnceCell<AudioRef>> {
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone()
    }

    fn artifact(&self, key: &str) -> AudioRef {
        let file_name = format!("{}.mp3", key);
        AudioRef {
            fingerprint: key.to_string(),
            path: self.dir.join(&file_name),
            url: format!("{}/{}", self.public_prefix, file_name),
        }
    }

    async fn populate(
        &self,
        key: &str,
        cleaned: &str,
        language: &str,
        slow: bool,
    ) -> Result<AudioRef, SynthesisError> {
        let audio = self.artifact(key);

        if tokio::fs::try_exists(&audio.path).await.unwrap_or(false) {
            log::info!("Using cached audio file: {}", audio.path.display());
            return Ok(audio);
        }

        let text = truncate_for_speech(cleaned, self.max_chars);
        log::info!(
            "Generating new TTS audio for text: {}...",
            text.chars().take(50).collect::<String>()
        );
        let bytes = self.synthesizer.synthesize(&text, language, slow).await?;
        if bytes.is_empty() {
            return Err(SynthesisError::Tool("synthesizer returned no audio".into()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!("{}.{}.part", key, uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &audio.path).await?;
        Ok(audio)
    }
}
