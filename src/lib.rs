//! # SMV E-rickshaw Assistant
//!
//! Chat assistant core for SMV e-rickshaw drivers: per-session conversation
//! history, a persona-constrained prompt built from live dashboard data,
//! Gemini reply generation with a safe fallback, and a fingerprinted
//! speech cache that synthesizes each distinct reply at most once.
//!
//! The [`server`] module exposes it all over HTTP; the `server` binary wires
//! it to the real Gemini, Google TTS, ffmpeg and map backends.

pub mod chat;
pub mod config;
pub mod llms;
pub mod maps;
pub mod server;
pub mod speech;
pub mod utilities;

pub use chat::{Orchestrator, TurnRequest, TurnResult};
pub use config::AssistantConfig;

/// Crate version reported by `/health`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
