//! # DebateLLM
//!
//! DebateLLM orchestrates a structured, multi-round debate between several independently
//! queried LLM agents on a single topic, automatically detects when their positions have
//! converged, and produces one synthesized answer.
//!
//! The crate provides layered abstractions for:
//!
//! * **Chat Client Contract**: the [`ClientWrapper`] trait, one operation that submits
//!   role-tagged messages for a named model with sampling parameters and returns text or a
//!   categorized [`ChatError`]
//! * **Session Model**: [`DebateConfig`] validation, [`DebateSession`] lifecycle, append-only
//!   [`DebateRound`]s with per-agent responses and convergence assessments
//! * **Round Execution**: concurrent fan-out to every participant with per-agent retry and
//!   exponential backoff; one degraded agent never fails the round
//! * **Convergence Evaluation**: a moderator model judges convergence; its free-form reply is
//!   defensively parsed and the confidence score clamped into `[0, 1]`
//! * **Synthesis**: a synthesizer model integrates all viewpoints into one final answer, with
//!   a deterministic extractive fallback when the call fails
//! * **Orchestration**: [`DebateOrchestrator`] drives the round loop bounded by a max-round
//!   count, finalizes session status, and emits progress events through [`EventHandler`]
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use debatellm::clients::openai::OpenAIClient;
//! use debatellm::{DebateConfig, DebateOrchestrator, DebateSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     debatellm::init_logger();
//!
//!     let api_key = std::env::var("OPEN_AI_SECRET")?;
//!     let client = Arc::new(OpenAIClient::new(&api_key));
//!
//!     let config = DebateConfig::new(
//!         "What is the best programming language?",
//!         vec!["deepseek".to_string(), "gpt-5".to_string()],
//!     )
//!     .with_max_rounds(3)
//!     .with_convergence_threshold(0.8);
//!
//!     let mut session = DebateSession::new(config)?;
//!     let orchestrator = DebateOrchestrator::new(client);
//!
//!     let result = orchestrator.run(&mut session).await?;
//!     println!("Converged: {}", result.convergence_achieved);
//!     println!("Final answer:\n{}", result.final_answer);
//!     Ok(())
//! }
//! ```
//!
//! Sessions can later be continued: [`DebateOrchestrator::continue_debate`] extends the round
//! budget, optionally appends steering text to the topic, and resumes from the existing round
//! history without replaying it.

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// The helper is intentionally lightweight so that applications embedding DebateLLM can opt-in
/// to simple `RUST_LOG` driven diagnostics without having to choose a specific logging backend
/// upfront.
///
/// ```rust
/// debatellm::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `debatellm` module.
pub mod debatellm;

// Re-exporting key items for easier external access.
pub use crate::debatellm::client_wrapper;
pub use crate::debatellm::client_wrapper::{
    ChatError, ChatResponse, ClientWrapper, Message, Role, SamplingParams, TokenUsage,
};
pub use crate::debatellm::clients;
pub use crate::debatellm::convergence;
pub use crate::debatellm::event;
pub use crate::debatellm::event::{DebateEvent, EventHandler};
pub use crate::debatellm::orchestrator;
pub use crate::debatellm::orchestrator::{DebateError, DebateOrchestrator, DebateResult};
pub use crate::debatellm::round_executor;
pub use crate::debatellm::session;
pub use crate::debatellm::session::{
    AgentResponse, ConfigError, ConvergenceAssessment, DebateConfig, DebateRound, DebateSession,
    DebateStatus, ValidationIssue,
};
pub use crate::debatellm::session_store;
pub use crate::debatellm::session_store::{SessionStore, StoreError};
pub use crate::debatellm::synthesizer;
