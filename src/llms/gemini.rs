//! Google Gemini client.
//!
//! Stateless `generateContent` calls: each request carries the full
//! flattened conversation. The same client transcribes voice input by
//! sending the recording as an inline `audio/wav` part.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ReplyGenerator;
use crate::config::AssistantConfig;
use crate::speech::transcribe::Transcriber;
use crate::utilities::errors::GenerationError;

/// Instruction sent alongside recorded audio.
pub const TRANSCRIBE_INSTRUCTION: &str = "Please transcribe the following audio accurately. \
Just return the transcription text without any additional commentary.";

/// Model used for transcription; audio input needs a 2.x flash model.
pub const TRANSCRIBE_MODEL: &str = "gemini-2.0-flash";

/// Sampling parameters sent with every chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 1024,
        }
    }
}

/// Gemini REST client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    transcribe_model: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    /// Create a client for `model`.
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            transcribe_model: TRANSCRIBE_MODEL.to_string(),
            generation: GenerationConfig::default(),
        })
    }

    /// Create a client from process configuration.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, GenerationError> {
        Self::new(
            config.google_api_key.clone(),
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
        )
    }

    /// Override sampling parameters.
    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Chat model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Request body for a single-turn text prompt.
    pub fn build_request_body(&self, prompt: &str) -> Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
            "generationConfig": self.generation,
        })
    }

    async fn post(&self, model: &str, body: &Value) -> Result<Value, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingApiKey)?;

        let resp = self
            .http
            .post(self.endpoint(model))
            .header("content-type", "application/json")
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        let json: Value = serde_json::from_str(&text).map_err(|e| {
            GenerationError::Malformed(format!(
                "{} - Body: {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })?;

        if let Some(error) = json.get("error") {
            let msg = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown Gemini API error");
            return Err(GenerationError::Malformed(msg.to_string()));
        }
        Ok(json)
    }
}

/// Concatenate the text parts of the first candidate.
pub fn extract_text(response: &Value) -> Result<String, GenerationError> {
    let candidate = response
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| GenerationError::Malformed("No candidates in Gemini response".into()))?;

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| GenerationError::Malformed("No content.parts in Gemini response".into()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(text.to_string())
}

#[async_trait]
impl ReplyGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        log::debug!(
            "GeminiClient.generate: model={}, prompt_chars={}",
            self.model,
            prompt.chars().count()
        );
        let body = self.build_request_body(prompt);
        let json = self.post(&self.model, &body).await?;

        if let Some(usage) = json.get("usageMetadata") {
            log::debug!("Gemini usage: {}", usage);
        }
        extract_text(&json)
    }
}

#[async_trait]
impl Transcriber for GeminiClient {
    async fn transcribe(&self, wav: &[u8]) -> Result<String, GenerationError> {
        let audio_b64 = base64::engine::general_purpose::STANDARD.encode(wav);
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": TRANSCRIBE_INSTRUCTION },
                    { "inline_data": { "mime_type": "audio/wav", "data": audio_b64 } },
                ],
            }],
        });

        let json = self.post(&self.transcribe_model, &body).await?;
        let text = extract_text(&json)?;
        log::info!("Direct transcription result: {}", text);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(
            Some("test-key".into()),
            "https://generativelanguage.googleapis.com/v1beta/",
            "gemini-1.5-flash",
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint("gemini-1.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = client().build_request_body("USER QUESTION: hi");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "USER QUESTION: hi");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let resp = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Namaste! " }, { "text": "Battery is 93%." }] }
            }]
        });
        assert_eq!(extract_text(&resp).unwrap(), "Namaste! Battery is 93%.");
    }

    #[test]
    fn test_extract_text_errors() {
        assert!(matches!(
            extract_text(&serde_json::json!({})),
            Err(GenerationError::Malformed(_))
        ));
        let empty = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
        });
        assert!(matches!(extract_text(&empty), Err(GenerationError::Empty)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = GeminiClient::new(None, "http://127.0.0.1:9", "gemini-1.5-flash").unwrap();
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::MissingApiKey));
    }
}
