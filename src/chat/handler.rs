//! Chat handlers - POST /api/chat, /api/tts and /api/transcribe.
//!
//! Thin adapters: validate input, delegate to the [`Orchestrator`], the
//! speech cache or the voice pipeline, and shape the JSON response.
//!
//! [`Orchestrator`]: super::orchestrator::Orchestrator

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::orchestrator::TurnRequest;
use super::session::DEFAULT_SESSION_ID;
use crate::server::{ApiError, AppState};
use crate::speech::slow_for_speed;

// ============================================================================
// Request / Response types
// ============================================================================

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_speed() -> f32 {
    1.0
}

/// Incoming chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The driver's message.
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    /// Speech language code (default `en`).
    #[serde(default = "default_language")]
    pub language: String,
    /// Playback speed; below 1.0 also selects the slow voice.
    #[serde(default = "default_speed")]
    pub speed: f32,
}

/// Chat response.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub audio_url: Option<String>,
    pub session_id: String,
    /// RFC 3339 time the reply was produced.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TtsResponse {
    pub audio_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/chat - run one turn.
///
/// Generation failures are not HTTP errors: the response carries the
/// fallback reply plus an `error` field.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("No message provided"));
    }
    let session_id = if request.session_id.trim().is_empty() {
        default_session_id()
    } else {
        request.session_id
    };
    tracing::info!(session_id = %session_id, "Chat request");

    let result = state
        .orchestrator
        .handle_turn(TurnRequest {
            message: request.message,
            session_id,
            language: request.language,
            speed: request.speed,
        })
        .await;

    Ok(Json(ChatResponse {
        response: result.reply,
        audio_url: result.audio.map(|a| a.url),
        session_id: result.session_id,
        timestamp: chrono::Utc::now().to_rfc3339(),
        error: result.error,
    }))
}

/// POST /api/tts - speak arbitrary text through the cache.
pub async fn tts_handler(
    State(state): State<AppState>,
    Json(request): Json<TtsRequest>,
) -> Result<Json<TtsResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("No text provided"));
    }

    let audio = state
        .orchestrator
        .speech()
        .synthesize(
            &request.text,
            &request.language,
            slow_for_speed(request.speed),
            request.speed,
        )
        .await
        .ok_or_else(|| ApiError::internal("Failed to generate audio"))?;

    Ok(Json(TtsResponse {
        audio_url: audio.url,
    }))
}

/// POST /api/transcribe - multipart field `audio` holding a WebM recording.
pub async fn transcribe_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let mut audio = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("audio") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed reading audio field: {e}")))?;
            audio = Some(bytes);
            break;
        }
    }

    let audio = audio.ok_or_else(|| ApiError::bad_request("No audio file provided"))?;
    if audio.is_empty() {
        return Err(ApiError::bad_request("Empty audio file received"));
    }
    tracing::info!(bytes = audio.len(), "Transcribe request");

    let text = state.voice.transcribe_webm(&audio).await.map_err(|e| {
        tracing::error!(error = %e, "Transcription failed");
        ApiError::from(e)
    })?;
    if text.trim().is_empty() {
        return Err(ApiError::internal("Could not transcribe audio"));
    }
    Ok(Json(TranscribeResponse { text }))
}
