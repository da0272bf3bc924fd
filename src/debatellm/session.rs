//! Core data model for debate sessions.
//!
//! A [`DebateSession`] owns one validated [`DebateConfig`], an append-only sequence of
//! [`DebateRound`]s, and a lifecycle [`DebateStatus`]. Sessions are plain values: the
//! orchestrator mutates one in place under an exclusive ownership contract and persistence
//! (if any) is left to the caller.

use std::error::Error;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Model identifiers accepted as debate participants, moderators, or synthesizers.
pub const KNOWN_MODELS: &[&str] = &[
    "gpt-5",
    "gpt-5-mini",
    "gpt-4o",
    "claude",
    "gemini",
    "grok",
    "deepseek",
    "qwen",
    "llama",
];

/// Whether `model` belongs to the fixed set of known model identifiers.
pub fn is_known_model(model: &str) -> bool {
    KNOWN_MODELS.iter().any(|known| *known == model)
}

/// Lifecycle status of a debate session.
///
/// Strict progression: `pending` → `in_progress` → (`converged` | `max_rounds_reached`) →
/// `completed`. The only backward transition is an explicit continuation, which resets a
/// completed session to `in_progress`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateStatus {
    Pending,
    InProgress,
    Converged,
    MaxRoundsReached,
    Completed,
}

/// A single problem found while validating a [`DebateConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Name of the offending config field.
    pub field: &'static str,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Rejection of an invalid [`DebateConfig`], carrying every issue found.
#[derive(Clone, Debug)]
pub struct ConfigError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid debate config: ")?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl Error for ConfigError {}

/// Configuration of a debate: the topic, the participants, and the stop criteria.
///
/// Immutable once a session starts, except that a continuation may increase `max_rounds`
/// and append user-supplied steering text to the topic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebateConfig {
    /// The question the agents debate. Must contain non-whitespace text.
    pub topic: String,
    /// Ordered participant model identifiers; at least two, all drawn from [`KNOWN_MODELS`].
    pub participants: Vec<String>,
    /// Upper bound on the number of rounds; must be greater than zero.
    pub max_rounds: usize,
    /// Confidence the moderator must report, in `[0, 1]`, before convergence is accepted.
    pub convergence_threshold: f64,
    /// Model asked to judge convergence after each round.
    pub moderator_model: String,
    /// Model asked to produce the final synthesized answer.
    pub synthesizer_model: String,
}

impl DebateConfig {
    /// Create a config with the given topic and participants and conventional defaults:
    /// three rounds, a 0.8 convergence threshold, and `gpt-5` moderating and synthesizing.
    pub fn new(topic: impl Into<String>, participants: Vec<String>) -> Self {
        Self {
            topic: topic.into(),
            participants,
            max_rounds: 3,
            convergence_threshold: 0.8,
            moderator_model: "gpt-5".to_string(),
            synthesizer_model: "gpt-5".to_string(),
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_moderator_model(mut self, model: impl Into<String>) -> Self {
        self.moderator_model = model.into();
        self
    }

    pub fn with_synthesizer_model(mut self, model: impl Into<String>) -> Self {
        self.synthesizer_model = model.into();
        self
    }

    /// Validate the config as a pure predicate over its fields.
    ///
    /// An empty result means the config is accepted. Problems are reported per field and
    /// never silently corrected.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.topic.trim().is_empty() {
            issues.push(ValidationIssue::new(
                "topic",
                "topic must contain non-whitespace text",
            ));
        }

        if self.participants.len() < 2 {
            issues.push(ValidationIssue::new(
                "participants",
                format!(
                    "a debate needs at least 2 participants, got {}",
                    self.participants.len()
                ),
            ));
        }
        for model in &self.participants {
            if !is_known_model(model) {
                issues.push(ValidationIssue::new(
                    "participants",
                    format!("unknown model identifier '{}'", model),
                ));
            }
        }

        if self.max_rounds == 0 {
            issues.push(ValidationIssue::new(
                "max_rounds",
                "max_rounds must be greater than zero",
            ));
        }

        if !self.convergence_threshold.is_finite()
            || self.convergence_threshold < 0.0
            || self.convergence_threshold > 1.0
        {
            issues.push(ValidationIssue::new(
                "convergence_threshold",
                format!(
                    "convergence_threshold must be within [0, 1], got {}",
                    self.convergence_threshold
                ),
            ));
        }

        if !is_known_model(&self.moderator_model) {
            issues.push(ValidationIssue::new(
                "moderator_model",
                format!("unknown model identifier '{}'", self.moderator_model),
            ));
        }
        if !is_known_model(&self.synthesizer_model) {
            issues.push(ValidationIssue::new(
                "synthesizer_model",
                format!("unknown model identifier '{}'", self.synthesizer_model),
            ));
        }

        issues
    }
}

/// One agent's contribution to a round.
///
/// A response with a non-empty `error` and empty `content` represents a degraded agent for
/// that round; it never aborts the round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Participant model identifier.
    pub model: String,
    /// The agent's text; empty when the agent was degraded.
    pub content: String,
    /// When the response (or the final failure) was captured.
    pub timestamp: DateTime<Utc>,
    /// Human-readable description of the failure, if the agent was degraded.
    pub error: Option<String>,
}

impl AgentResponse {
    /// A successful response captured now.
    pub fn ok(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            content: content.into(),
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// A degraded response: empty content plus an error description.
    pub fn failed(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            content: String::new(),
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }

    /// Whether this entry records a failure instead of content.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// The judged state of the debate after a completed round.
///
/// Always well-formed regardless of what the judging model returned: the confidence score
/// is clamped into `[0, 1]` on construction and NaN collapses to zero.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvergenceAssessment {
    pub is_converged: bool,
    pub confidence_score: f64,
    pub reasoning: String,
}

impl ConvergenceAssessment {
    pub fn new(is_converged: bool, confidence_score: f64, reasoning: impl Into<String>) -> Self {
        Self {
            is_converged,
            confidence_score: clamp_confidence(confidence_score),
            reasoning: reasoning.into(),
        }
    }
}

/// Force a raw confidence value into a finite number in `[0, 1]`.
pub fn clamp_confidence(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// One synchronized pass in which every participant responded once to the shared context.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebateRound {
    /// 1-based round number, equal to this round's position in the session sequence.
    pub round_number: usize,
    /// Responses in configured participant order.
    pub responses: Vec<AgentResponse>,
    /// Convergence assessment computed after the round completed.
    pub assessment: Option<ConvergenceAssessment>,
}

/// A debate session: config, accumulated rounds, lifecycle status, and final outputs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DebateSession {
    pub id: Uuid,
    pub config: DebateConfig,
    /// Append-only; insertion order is round order.
    pub rounds: Vec<DebateRound>,
    pub status: DebateStatus,
    pub final_answer: Option<String>,
    pub final_assessment: Option<ConvergenceAssessment>,
    pub created_at: DateTime<Utc>,
}

impl DebateSession {
    /// Mint a new session for a validated config.
    ///
    /// Rejected configs never produce a session; the error lists every issue found.
    pub fn new(config: DebateConfig) -> Result<Self, ConfigError> {
        let issues = config.validate();
        if !issues.is_empty() {
            return Err(ConfigError { issues });
        }
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            rounds: Vec::new(),
            status: DebateStatus::Pending,
            final_answer: None,
            final_assessment: None,
            created_at: Utc::now(),
        })
    }

    /// Append a completed round, assigning the next contiguous round number.
    pub fn push_round(&mut self, responses: Vec<AgentResponse>) {
        let round_number = self.rounds.len() + 1;
        self.rounds.push(DebateRound {
            round_number,
            responses,
            assessment: None,
        });
    }

    pub fn total_rounds(&self) -> usize {
        self.rounds.len()
    }
}
