// src/debatellm/mod.rs

pub mod client_wrapper;
pub mod clients;
pub mod convergence;
pub mod event;
pub mod orchestrator;
pub mod round_executor;
pub mod session;
pub mod session_store;
pub mod synthesizer;

// Explicitly export the most commonly used types so callers can reach them as
// debatellm::DebateSession instead of debatellm::session::DebateSession.
pub use orchestrator::{DebateOrchestrator, DebateResult};
pub use session::{DebateConfig, DebateSession};
pub use session_store::SessionStore;
