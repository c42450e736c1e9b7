//! Speech synthesis capability.
//!
//! [`GoogleTranslateTts`] talks to Google Translate's public `translate_tts`
//! endpoint. It accepts short text fragments only, so long replies are split
//! into chunks whose MP3 responses are concatenated frame-wise.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::utilities::errors::SynthesisError;

/// Google's per-request character limit for `translate_tts`.
pub const TTS_CHUNK_CHARS: usize = 100;

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Produces audio for already-cleaned text.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync + fmt::Debug {
    /// Synthesize `text` in `language`; `slow` selects the slower voice.
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        slow: bool,
    ) -> Result<Bytes, SynthesisError>;
}

/// Google Translate text-to-speech client.
#[derive(Debug, Clone)]
pub struct GoogleTranslateTts {
    http: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslateTts {
    /// Create a client against the public endpoint.
    pub fn new() -> Result<Self, SynthesisError> {
        Self::with_endpoint(TRANSLATE_TTS_URL)
    }

    /// Create a client against a custom endpoint.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, SynthesisError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (SMV E-RickshawAssistant)")
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        index: usize,
        total: usize,
        language: &str,
        slow: bool,
    ) -> Result<Bytes, SynthesisError> {
        let speed = if slow { "0.3" } else { "1" };
        let idx = index.to_string();
        let total_s = total.to_string();
        let textlen = chunk.chars().count().to_string();

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("q", chunk),
                ("tl", language),
                ("ttsspeed", speed),
                ("idx", idx.as_str()),
                ("total", total_s.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SynthesisError::Status(resp.status().as_u16()));
        }
        Ok(resp.bytes().await?)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        slow: bool,
    ) -> Result<Bytes, SynthesisError> {
        let chunks = split_for_tts(text, TTS_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        log::debug!(
            "GoogleTranslateTts.synthesize: lang={}, slow={}, chunks={}",
            language,
            slow,
            chunks.len()
        );

        let mut audio = BytesMut::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let part = self
                .fetch_chunk(chunk, i, chunks.len(), language, slow)
                .await?;
            audio.extend_from_slice(&part);
        }
        Ok(audio.freeze())
    }
}

/// Split text into pieces of at most `max_chars` characters, preferring
/// sentence ends, then word boundaries, and hard-cutting only single words
/// longer than the limit.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let flush = |current: &mut String, current_len: &mut usize, chunks: &mut Vec<String>| {
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        current.clear();
        *current_len = 0;
    };

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            flush(&mut current, &mut current_len, &mut chunks);
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current_len == 0 { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            flush(&mut current, &mut current_len, &mut chunks);
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;

        if word.ends_with(['.', '!', '?', '।']) && current_len > max_chars / 2 {
            flush(&mut current, &mut current_len, &mut chunks);
        }
    }
    flush(&mut current, &mut current_len, &mut chunks);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_short_text_single_chunk() {
        assert_eq!(split_for_tts("Battery is low.", 100), vec!["Battery is low."]);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_for_tts("   ", 100).is_empty());
    }

    #[test]
    fn test_split_respects_limit() {
        let text = "Check the battery terminals and make sure they are tight. ".repeat(10);
        let chunks = split_for_tts(&text, 100);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 100, "chunk too long: {}", c);
        }
        assert_eq!(chunks.join(" "), text.trim());
    }

    #[test]
    fn test_split_hard_cuts_long_word() {
        let word = "x".repeat(250);
        let chunks = split_for_tts(&word, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 50);
    }
}
