//! The debate state machine.
//!
//! Drives the round executor and the convergence evaluator in a loop bounded by the
//! configured max-round count, then invokes the synthesizer and finalizes session status.
//! Rounds are strictly sequential, since round N+1's context depends on round N's results;
//! the only true parallelism is the per-participant fan-out inside a single round.
//!
//! The orchestrator owns the session exclusively for the duration of one run and only
//! appends to its round list, never rewriting already-emitted rounds.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::client_wrapper::{ClientWrapper, SamplingParams};
use crate::convergence;
use crate::event::{DebateEvent, EventHandler};
use crate::round_executor;
use crate::session::{DebateSession, DebateStatus};
use crate::synthesizer;

/// Rounds added to `max_rounds` when a completed debate is continued.
pub const CONTINUATION_ROUND_INCREMENT: usize = 3;

/// Failure of the orchestration itself. External call failures never surface here: every
/// agent, evaluator, and synthesizer call site has a defined degraded fallback.
#[derive(Debug)]
pub enum DebateError {
    /// The session is in a state this operation cannot advance.
    InvalidState(String),
}

impl fmt::Display for DebateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DebateError::InvalidState(msg) => write!(f, "invalid session state: {}", msg),
        }
    }
}

impl Error for DebateError {}

/// Result bundle of one completed run.
#[derive(Clone, Debug)]
pub struct DebateResult {
    /// Snapshot of the full session after the run.
    pub session: DebateSession,
    /// The synthesized (or fallback) final answer; never empty.
    pub final_answer: String,
    /// Total rounds accumulated in the session, including rounds from earlier runs.
    pub total_rounds: usize,
    /// True iff the run stopped via convergence rather than max-round exhaustion.
    pub convergence_achieved: bool,
}

/// Orchestrates debate sessions against a single [`ClientWrapper`].
///
/// One orchestrator may advance many independent sessions concurrently, but a single
/// session must only ever be driven by one `run`/`continue_debate` call at a time.
pub struct DebateOrchestrator {
    client: Arc<dyn ClientWrapper>,
    sampling: SamplingParams,
    event_handler: Option<Arc<dyn EventHandler>>,
}

impl DebateOrchestrator {
    pub fn new(client: Arc<dyn ClientWrapper>) -> Self {
        Self {
            client,
            sampling: SamplingParams::default().with_temperature(0.7),
            event_handler: None,
        }
    }

    /// Replace the sampling parameters forwarded with every participant query.
    pub fn with_sampling_params(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Register a progress handler, invoked once per completed round and once per
    /// individual agent response (among other lifecycle events).
    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    async fn emit(&self, event: DebateEvent) {
        if let Some(handler) = &self.event_handler {
            handler.on_debate_event(&event).await;
        }
    }

    /// Run a `pending` or `in_progress` session to completion.
    ///
    /// A `completed` session is rejected; use [`continue_debate`](Self::continue_debate)
    /// to extend it instead.
    pub async fn run(&self, session: &mut DebateSession) -> Result<DebateResult, DebateError> {
        if session.status == DebateStatus::Completed {
            return Err(DebateError::InvalidState(
                "session is already completed; use continue_debate to extend it".to_string(),
            ));
        }
        Ok(self.drive(session).await)
    }

    /// Re-enter the loop on a session, typically an already-completed one.
    ///
    /// Clears the final answer, extends the round budget by
    /// [`CONTINUATION_ROUND_INCREMENT`], optionally appends steering text to the topic,
    /// and resumes. Prior rounds are preserved, never truncated or replayed.
    pub async fn continue_debate(
        &self,
        session: &mut DebateSession,
        steering: Option<&str>,
    ) -> Result<DebateResult, DebateError> {
        session.final_answer = None;
        session.config.max_rounds += CONTINUATION_ROUND_INCREMENT;
        if let Some(note) = steering {
            let note = note.trim();
            if !note.is_empty() {
                session.config.topic.push_str("\n\nAdditional direction: ");
                session.config.topic.push_str(note);
            }
        }
        session.status = DebateStatus::InProgress;
        Ok(self.drive(session).await)
    }

    /// The state machine proper: round loop, convergence checks, synthesis, finalization.
    async fn drive(&self, session: &mut DebateSession) -> DebateResult {
        session.status = DebateStatus::InProgress;
        log::info!(
            "debate {} starting: {} participants, {} round(s) budgeted, {} already run",
            session.id,
            session.config.participants.len(),
            session.config.max_rounds,
            session.rounds.len()
        );
        self.emit(DebateEvent::RunStarted {
            session_id: session.id,
            topic: session.config.topic.clone(),
            participant_count: session.config.participants.len(),
        })
        .await;

        let mut converged = false;
        while session.rounds.len() < session.config.max_rounds {
            let round_number = session.rounds.len() + 1;
            self.emit(DebateEvent::RoundStarted {
                session_id: session.id,
                round: round_number,
            })
            .await;

            let responses =
                round_executor::execute_round(&self.client, session, &self.sampling).await;
            for response in &responses {
                if response.is_degraded() {
                    self.emit(DebateEvent::AgentFailed {
                        session_id: session.id,
                        round: round_number,
                        response: response.clone(),
                    })
                    .await;
                } else {
                    self.emit(DebateEvent::AgentResponded {
                        session_id: session.id,
                        round: round_number,
                        response: response.clone(),
                    })
                    .await;
                }
            }
            session.push_round(responses);

            // Evaluate over the full history, including the round just appended.
            let assessment = convergence::evaluate(self.client.as_ref(), session).await;
            self.emit(DebateEvent::ConvergenceChecked {
                session_id: session.id,
                round: round_number,
                assessment: assessment.clone(),
                threshold: session.config.convergence_threshold,
            })
            .await;

            if let Some(round) = session.rounds.last_mut() {
                round.assessment = Some(assessment.clone());
            }
            session.final_assessment = Some(assessment.clone());

            if let Some(round) = session.rounds.last() {
                self.emit(DebateEvent::RoundCompleted {
                    session_id: session.id,
                    round: round.clone(),
                })
                .await;
            }

            if assessment.is_converged {
                log::info!(
                    "debate {} converged after round {} (confidence {:.2})",
                    session.id,
                    round_number,
                    assessment.confidence_score
                );
                session.status = DebateStatus::Converged;
                converged = true;
                break;
            }
        }

        if !converged {
            log::info!(
                "debate {} reached its round budget of {} without converging",
                session.id,
                session.config.max_rounds
            );
            session.status = DebateStatus::MaxRoundsReached;
        }

        let final_answer = synthesizer::synthesize(self.client.as_ref(), session).await;
        session.final_answer = Some(final_answer.clone());
        session.status = DebateStatus::Completed;

        self.emit(DebateEvent::SynthesisCompleted {
            session_id: session.id,
            final_answer: final_answer.clone(),
        })
        .await;
        self.emit(DebateEvent::RunCompleted {
            session_id: session.id,
            total_rounds: session.rounds.len(),
            convergence_achieved: converged,
        })
        .await;

        DebateResult {
            final_answer,
            total_rounds: session.rounds.len(),
            convergence_achieved: converged,
            session: session.clone(),
        }
    }
}
