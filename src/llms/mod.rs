//! Generation capability used by the turn orchestrator.
//!
//! - [`ReplyGenerator`] - prompt in, reply text out
//! - [`gemini`] - Google Gemini implementation (also provides transcription)

pub mod gemini;

use std::fmt;

use async_trait::async_trait;

use crate::utilities::errors::GenerationError;

pub use gemini::{GeminiClient, GenerationConfig};

/// External large-language-model collaborator.
///
/// The orchestrator always sends the whole conversation flattened into one
/// prompt, so implementations hold no per-session state.
#[async_trait]
pub trait ReplyGenerator: Send + Sync + fmt::Debug {
    /// Generate a reply for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
