//! Turn Orchestrator - one chat turn, start to finish.
//!
//! The pipeline per message:
//! 1. Resolve session (create with persona turn on first contact)
//! 2. Build prompt from dashboard + history
//! 3. Generate reply (bounded by a timeout)
//! 4. Enforce persona contract, or substitute the fallback reply
//! 5. Persist user + assistant turns
//! 6. Synthesize speech through the cache (best effort)
//! 7. Return [`TurnResult`]
//!
//! No step can make `handle_turn` fail: generation errors become the
//! fallback reply plus an error marker, and synthesis errors become "no
//! audio".

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;

use super::dashboard::DashboardSnapshot;
use super::prompt::{build_prompt, Persona};
use super::session::{SessionStore, DEFAULT_SESSION_ID};
use crate::llms::ReplyGenerator;
use crate::speech::{slow_for_speed, AudioRef, SpeechCache};
use crate::utilities::errors::GenerationError;

/// Inbound turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub message: String,
    pub session_id: String,
    pub language: String,
    pub speed: f32,
}

impl TurnRequest {
    /// English, normal speed, default session.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: DEFAULT_SESSION_ID.to_string(),
            language: "en".to_string(),
            speed: 1.0,
        }
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

/// Outcome of a turn. Built fresh per call.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    /// Reply text, real or fallback. Never empty.
    pub reply: String,
    /// Synthesized speech, if synthesis succeeded.
    pub audio: Option<AudioRef>,
    pub session_id: String,
    /// Set when the reply is the fallback.
    pub error: Option<String>,
}

/// Coordinates sessions, prompt building, generation and speech.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    persona: Persona,
    sessions: Arc<SessionStore>,
    dashboard: Arc<RwLock<DashboardSnapshot>>,
    generator: Arc<dyn ReplyGenerator>,
    speech: SpeechCache,
    generation_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        persona: Persona,
        dashboard: DashboardSnapshot,
        generator: Arc<dyn ReplyGenerator>,
        speech: SpeechCache,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(persona.system_instruction()));
        Self {
            persona,
            sessions,
            dashboard: Arc::new(RwLock::new(dashboard)),
            generator,
            speech,
            generation_timeout: Duration::from_secs(30),
        }
    }

    /// Bound for a single generation call.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn speech(&self) -> &SpeechCache {
        &self.speech
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Current dashboard snapshot.
    pub fn dashboard(&self) -> DashboardSnapshot {
        self.dashboard.read().clone()
    }

    /// Replace the dashboard snapshot used by subsequent turns.
    pub fn set_dashboard(&self, snapshot: DashboardSnapshot) {
        *self.dashboard.write() = snapshot;
    }

    /// Run one chat turn.
    pub async fn handle_turn(&self, request: TurnRequest) -> TurnResult {
        let session = self.sessions.get_or_create(&request.session_id);
        let first_message = session.is_first_user_message();
        if self.persona.is_critical(&request.message) {
            log::warn!(
                "Critical issue reported in session {}: {}",
                request.session_id,
                request.message
            );
        }

        let prompt = build_prompt(
            &self.persona,
            &self.dashboard(),
            &session.turns(),
            &request.message,
            first_message,
        );

        let (reply, error) = match self.generate(&prompt).await {
            Ok(text) => {
                let reply = self.persona.enforce_contract(&text, first_message);
                session.append_exchange(request.message.trim(), reply.clone());
                (reply, None)
            }
            Err(e) => {
                log::error!("Generation failed for session {}: {}", request.session_id, e);
                (self.persona.fallback_reply(first_message), Some(e.to_string()))
            }
        };

        let audio = self
            .speech
            .synthesize(
                &reply,
                &request.language,
                slow_for_speed(request.speed),
                request.speed,
            )
            .await;
        if audio.is_none() {
            log::warn!("No audio for session {}", request.session_id);
        }

        TurnResult {
            reply,
            audio,
            session_id: request.session_id,
            error,
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.generation_timeout, self.generator.generate(prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => Err(GenerationError::Empty),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(GenerationError::Timeout(self.generation_timeout.as_secs())),
        }
    }
}
