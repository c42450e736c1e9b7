//! HTTP server for the assistant.
//!
//! # Endpoints
//!
//! - `GET  /health`         - Liveness probe
//! - `POST /api/chat`       - One chat turn
//! - `POST /api/tts`        - Speak text
//! - `POST /api/transcribe` - Voice input
//! - `POST /api/geocode`, `/api/places`, `/api/route` - Map lookups
//! - `GET  /static/*`       - Frontend assets and cached audio

pub mod error;
pub mod routes;

pub use error::ApiError;
pub use routes::{app_router, AppState};
