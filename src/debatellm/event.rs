//! Debate progress event system.
//!
//! Provides a callback-based observability layer for debate runs. Implement
//! [`EventHandler`] to receive real-time notifications about round boundaries, individual
//! agent successes and failures, convergence checks, synthesis, and run completion,
//! enough for a front end to
//! render a debate incrementally without polling session state.
//!
//! The handler is wrapped in `Arc<dyn EventHandler>` and registered on a
//! [`DebateOrchestrator`](crate::orchestrator::DebateOrchestrator) via
//! [`with_event_handler`](crate::orchestrator::DebateOrchestrator::with_event_handler).
//! The single trait method has a default no-op implementation, so implementors only match
//! the events they care about.
//!
//! # Example
//!
//! ```rust,no_run
//! use debatellm::event::{DebateEvent, EventHandler};
//! use async_trait::async_trait;
//!
//! struct ProgressPrinter;
//!
//! #[async_trait]
//! impl EventHandler for ProgressPrinter {
//!     async fn on_debate_event(&self, event: &DebateEvent) {
//!         match event {
//!             DebateEvent::AgentResponded { round, response, .. } => {
//!                 println!("round {}: {} answered ({} chars)", round, response.model, response.content.len());
//!             }
//!             DebateEvent::ConvergenceChecked { assessment, threshold, .. } => {
//!                 println!("convergence: {} (score {:.2}, threshold {:.2})",
//!                     assessment.is_converged, assessment.confidence_score, threshold);
//!             }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::session::{AgentResponse, ConvergenceAssessment, DebateRound};

/// Events emitted while a debate session is advanced.
///
/// Every variant carries the `session_id` so a single handler can observe multiple
/// concurrently running sessions.
#[derive(Debug, Clone)]
pub enum DebateEvent {
    /// The run (or continuation) has started; the session is now `in_progress`.
    RunStarted {
        session_id: Uuid,
        topic: String,
        participant_count: usize,
    },

    /// A new round is about to query all participants.
    RoundStarted { session_id: Uuid, round: usize },

    /// One participant answered. Fired once per successful participant per round, in
    /// configured participant order.
    AgentResponded {
        session_id: Uuid,
        round: usize,
        response: AgentResponse,
    },

    /// One participant exhausted its attempts (or hit an auth failure) and was recorded
    /// as degraded for this round. The response carries the failure description.
    AgentFailed {
        session_id: Uuid,
        round: usize,
        response: AgentResponse,
    },

    /// A round completed and its convergence assessment was attached.
    RoundCompleted { session_id: Uuid, round: DebateRound },

    /// The moderator's convergence judgment for the just-completed round.
    ConvergenceChecked {
        session_id: Uuid,
        round: usize,
        assessment: ConvergenceAssessment,
        /// The configured threshold the clamped confidence was compared against.
        threshold: f64,
    },

    /// The final answer was produced, by the synthesizer model or its extractive
    /// fallback. Always fires exactly once per run, just before [`DebateEvent::RunCompleted`].
    SynthesisCompleted {
        session_id: Uuid,
        final_answer: String,
    },

    /// The run finished; the session is `completed` with a non-empty final answer.
    RunCompleted {
        session_id: Uuid,
        total_rounds: usize,
        convergence_achieved: bool,
    },
}

/// Trait for receiving debate progress events.
///
/// The method has a **default no-op implementation**. The `Send + Sync` bound allows the
/// handler to be shared across tokio tasks via `Arc<dyn EventHandler>`; any internal state
/// needs its own synchronization.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Called once per emitted [`DebateEvent`].
    async fn on_debate_event(&self, _event: &DebateEvent) {}
}
