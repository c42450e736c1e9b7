//! Axum router for the assistant HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`         - Returns `{"status": "ok", "version": "0.3.0", ...}`
//! - `POST /api/chat`       - [`chat_handler`]
//! - `POST /api/tts`        - [`tts_handler`]
//! - `POST /api/transcribe` - [`transcribe_handler`]
//! - `POST /api/geocode`    - [`geocode_handler`]
//! - `POST /api/places`     - [`places_handler`]
//! - `POST /api/route`      - [`route_handler`]
//! - `GET  /static/*`       - static directory (frontend + audio cache)

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::chat::handler::{chat_handler, transcribe_handler, tts_handler};
use crate::chat::Orchestrator;
use crate::maps::handler::{geocode_handler, places_handler, route_handler};
use crate::maps::MapsService;
use crate::speech::VoiceInput;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    /// Chat turn pipeline; owns sessions and the speech cache.
    pub orchestrator: Arc<Orchestrator>,
    /// Voice input pipeline.
    pub voice: VoiceInput,
    /// Map backends.
    pub maps: MapsService,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(
        orchestrator: Orchestrator,
        voice: VoiceInput,
        maps: MapsService,
        static_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            voice,
            maps,
            static_dir: static_dir.into(),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/tts", post(tts_handler))
        .route("/api/transcribe", post(transcribe_handler))
        .route("/api/geocode", post(geocode_handler))
        .route("/api/places", post(places_handler))
        .route("/api/route", post(route_handler))
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health - liveness probe.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "smv-assistant",
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{DashboardSnapshot, Persona};
    use crate::config::AssistantConfig;
    use crate::llms::ReplyGenerator;
    use crate::speech::{SpeechCache, SpeechSynthesizer, Transcriber};
    use crate::utilities::errors::{GenerationError, SynthesisError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct FixedReply;

    #[async_trait]
    impl ReplyGenerator for FixedReply {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok("Your battery is at 93%.".into())
        }
    }

    #[async_trait]
    impl Transcriber for FixedReply {
        async fn transcribe(&self, _wav: &[u8]) -> Result<String, GenerationError> {
            Ok("battery status".into())
        }
    }

    #[derive(Debug)]
    struct Synth {
        fail: bool,
    }

    #[async_trait]
    impl SpeechSynthesizer for Synth {
        async fn synthesize(
            &self,
            _text: &str,
            _language: &str,
            _slow: bool,
        ) -> Result<Bytes, SynthesisError> {
            if self.fail {
                Err(SynthesisError::Status(503))
            } else {
                Ok(Bytes::from_static(b"ID3"))
            }
        }
    }

    fn test_state(dir: &std::path::Path, synth_fails: bool) -> AppState {
        let config = AssistantConfig {
            static_dir: dir.to_path_buf(),
            ..Default::default()
        };
        let speech = SpeechCache::new(
            config.audio_cache_dir(),
            config.audio_public_prefix.clone(),
            Arc::new(Synth { fail: synth_fails }),
        );
        let orchestrator = Orchestrator::new(
            Persona::default(),
            DashboardSnapshot::demo(),
            Arc::new(FixedReply),
            speech,
        );
        // A binary that cannot exist keeps the voice route deterministic.
        let voice = VoiceInput::new(Arc::new(FixedReply)).with_ffmpeg("/nonexistent/ffmpeg");
        let maps = MapsService::from_config(&config).unwrap();
        AppState::new(orchestrator, voice, maps, dir)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path(), false));

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::VERSION);
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_message() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path(), false));

        let response = app
            .oneshot(post_json("/api/chat", serde_json::json!({"message": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_chat_first_turn() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), false);
        let app = app_router(state.clone());

        let response = app
            .oneshot(post_json(
                "/api/chat",
                serde_json::json!({"message": "hi", "session_id": "s1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let reply = json["response"].as_str().unwrap();
        assert!(reply.starts_with("Namaste!"));
        assert!(reply.ends_with("For assistance, contact SMV at 1800-XXX-XXXX"));
        assert_eq!(json["session_id"], "s1");
        assert!(json.get("error").is_none());
        assert!(json["timestamp"].is_string());

        let url = json["audio_url"].as_str().unwrap();
        assert!(url.starts_with("/static/audio/cache/"));
        assert!(url.ends_with(".mp3"));
        assert!(!state.orchestrator.sessions().is_first_user_message("s1"));
    }

    #[tokio::test]
    async fn test_chat_without_audio_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path(), true));

        let response = app
            .oneshot(post_json("/api/chat", serde_json::json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["audio_url"].is_null());
        assert_eq!(json["session_id"], "default");
    }

    #[tokio::test]
    async fn test_tts_validation_and_failure() {
        let dir = tempfile::tempdir().unwrap();

        let app = app_router(test_state(dir.path(), false));
        let response = app
            .oneshot(post_json("/api/tts", serde_json::json!({"text": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let app = app_router(test_state(dir.path(), true));
        let response = app
            .oneshot(post_json("/api/tts", serde_json::json!({"text": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Failed to generate audio");
    }

    #[tokio::test]
    async fn test_tts_serves_cached_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), false);

        let response = app_router(state.clone())
            .oneshot(post_json("/api/tts", serde_json::json!({"text": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let url = body_json(response).await["audio_url"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app_router(state)
            .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ID3");
    }

    #[tokio::test]
    async fn test_transcribe_without_ffmpeg_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path(), false));

        let boundary = "X-BOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"rec.webm\"\r\nContent-Type: audio/webm\r\n\r\nabc\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/transcribe")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_transcribe_without_audio_field_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path(), false));

        let boundary = "X-BOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/transcribe")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No audio file provided");
    }

    #[tokio::test]
    async fn test_places_without_key_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_router(test_state(dir.path(), false));

        let response = app
            .clone()
            .oneshot(post_json("/api/places", serde_json::json!({"query": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json("/api/places", serde_json::json!({"query": "mall"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
