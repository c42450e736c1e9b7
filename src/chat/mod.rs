//! Chat core for the SMV e-rickshaw assistant.
//!
//! - [`session`] - per-session conversation history
//! - [`dashboard`] - vehicle telemetry fed into every prompt
//! - [`prompt`] - persona contract and prompt rendering
//! - [`orchestrator`] - one turn: prompt, generate, persist, speak
//! - [`handler`] - HTTP adapters

pub mod dashboard;
pub mod handler;
pub mod orchestrator;
pub mod prompt;
pub mod session;

pub use dashboard::{DashboardSnapshot, NearbyPlaces, Place};
pub use orchestrator::{Orchestrator, TurnRequest, TurnResult};
pub use prompt::{build_prompt, Persona};
pub use session::{Role, SessionHandle, SessionStore, Turn};
