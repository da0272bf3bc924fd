//! Convergence evaluation.
//!
//! After each completed round the moderator model is asked whether the debate has settled.
//! The moderator's free-form reply is expected to contain a JSON object but is never
//! trusted: parsing happens in two stages (extract the first balanced JSON object, then a
//! typed decode) and the confidence score is clamped into `[0, 1]` before any decision is
//! made. Every failure path collapses to a conservative non-converged fallback so the
//! debate can never silently terminate because the evaluator malfunctioned.

use std::error::Error;
use std::fmt;

use serde::Deserialize;

use crate::client_wrapper::{ClientWrapper, Message, SamplingParams};
use crate::session::{clamp_confidence, ConvergenceAssessment, DebateSession};

const EVALUATOR_SYSTEM_PROMPT: &str =
    "You are the moderator of a multi-agent debate. You judge whether the participants' \
     positions have converged enough that further rounds are unlikely to change them.";

/// The moderator's reply could not be decoded into a well-typed assessment.
#[derive(Debug)]
pub struct AssessmentParseError {
    details: String,
}

impl AssessmentParseError {
    fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
        }
    }
}

impl fmt::Display for AssessmentParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for AssessmentParseError {}

/// Raw decode target for the moderator's JSON reply. All three fields are required with
/// correct primitive types; anything else is a parse failure.
#[derive(Debug, Deserialize)]
struct RawAssessment {
    is_converged: bool,
    confidence_score: f64,
    reasoning: String,
}

/// Judge whether the debate should stop after the most recent round.
///
/// With zero rounds no external call is made and a fixed non-converged assessment is
/// returned. Otherwise the moderator model is queried once; the final convergence decision
/// is the conjunction of the model's own flag and its clamped confidence meeting the
/// configured threshold.
pub async fn evaluate(client: &dyn ClientWrapper, session: &DebateSession) -> ConvergenceAssessment {
    if session.rounds.is_empty() {
        return ConvergenceAssessment::new(
            false,
            0.0,
            "No debate rounds have been completed yet; there is nothing to evaluate.",
        );
    }

    let threshold = session.config.convergence_threshold;
    let messages = vec![
        Message::system(EVALUATOR_SYSTEM_PROMPT),
        Message::user(build_evaluation_prompt(session)),
    ];
    // Low temperature: the judgment should be as deterministic as the model allows.
    let sampling = SamplingParams::default().with_temperature(0.2);

    match client
        .send_message(&session.config.moderator_model, &messages, &sampling)
        .await
    {
        Ok(reply) => match parse_assessment(&reply.content) {
            Ok(raw) => {
                let confidence = clamp_confidence(raw.confidence_score);
                let is_converged = raw.is_converged && confidence >= threshold;
                log::debug!(
                    "convergence check for session {}: model said {} at {:.2}, threshold {:.2} -> {}",
                    session.id,
                    raw.is_converged,
                    confidence,
                    threshold,
                    is_converged
                );
                ConvergenceAssessment::new(is_converged, confidence, raw.reasoning)
            }
            Err(parse_err) => {
                log::warn!(
                    "convergence reply for session {} could not be parsed: {}",
                    session.id,
                    parse_err
                );
                failure_fallback(format!("could not parse moderator reply: {}", parse_err))
            }
        },
        Err(err) => {
            log::warn!(
                "convergence call for session {} errored: {}",
                session.id,
                err
            );
            failure_fallback(err.to_string())
        }
    }
}

/// Conservative assessment used whenever evaluation cannot produce a real judgment.
/// The reasoning always contains the literal marker "failed" for downstream detection.
fn failure_fallback(detail: String) -> ConvergenceAssessment {
    ConvergenceAssessment::new(
        false,
        0.0,
        format!("Convergence evaluation failed: {}", detail),
    )
}

/// Build the evaluation prompt: topic, threshold, transcript of all non-errored responses,
/// the fixed criteria, and the JSON answer instruction.
fn build_evaluation_prompt(session: &DebateSession) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Debate topic: {}\nConvergence threshold: {}\n\nTranscript:\n",
        session.config.topic, session.config.convergence_threshold
    ));

    for round in &session.rounds {
        prompt.push_str(&format!("--- Round {} ---\n", round.round_number));
        for response in round.responses.iter().filter(|r| !r.is_degraded()) {
            prompt.push_str(&format!("[agent {}]: {}\n", response.model, response.content));
        }
    }

    prompt.push_str(
        "\nEvaluation criteria:\n\
         1. Semantic alignment across the agents' positions.\n\
         2. Absence of newly emerging substantive arguments.\n\
         3. Mutual acknowledgment of other agents' points.\n\n\
         Answer with a single JSON object with exactly these three fields:\n\
         {\"is_converged\": <boolean>, \"confidence_score\": <number between 0 and 1>, \
         \"reasoning\": \"<short explanation>\"}\n",
    );

    prompt
}

/// Two-stage decode of the moderator reply: locate a balanced JSON object anywhere in the
/// text, then require the three typed fields.
fn parse_assessment(reply: &str) -> Result<RawAssessment, AssessmentParseError> {
    let candidate = extract_json_object(reply)
        .ok_or_else(|| AssessmentParseError::new("no JSON object found in reply"))?;
    serde_json::from_str::<RawAssessment>(candidate)
        .map_err(|err| AssessmentParseError::new(format!("malformed assessment object: {}", err)))
}

/// Extract the first balanced JSON object found anywhere in `text`.
///
/// The scan is string- and escape-aware so braces inside string literals do not confuse
/// the depth counter. Candidates that never balance are skipped in favour of later ones.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced object starting at the first character of `text`, which
/// must be `{`. Returns None when the object never closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_wrapper::{ChatError, ChatResponse};
    use crate::session::{AgentResponse, DebateConfig};
    use async_trait::async_trait;

    struct FixedClient {
        outcome: Result<String, ChatError>,
    }

    #[async_trait]
    impl ClientWrapper for FixedClient {
        async fn send_message(
            &self,
            _model: &str,
            _messages: &[Message],
            _params: &SamplingParams,
        ) -> Result<ChatResponse, ChatError> {
            self.outcome.clone().map(|content| ChatResponse {
                content,
                usage: None,
            })
        }
    }

    fn session_with_one_round() -> DebateSession {
        let mut session = DebateSession::new(DebateConfig::new(
            "What is the best programming language?",
            vec!["deepseek".to_string(), "gpt-5".to_string()],
        ))
        .unwrap();
        session.push_round(vec![
            AgentResponse::ok("deepseek", "Rust for systems work."),
            AgentResponse::failed("gpt-5", "agent gpt-5 failed after 3 attempt(s)"),
        ]);
        session
    }

    #[test]
    fn extracts_object_wrapped_in_prose() {
        let reply = "Sure! Here is my verdict:\n{\"is_converged\": true, \"confidence_score\": 0.9, \"reasoning\": \"agreement\"}\nHope that helps.";
        let json = extract_json_object(reply).unwrap();
        assert!(json.starts_with('{') && json.ends_with('}'));
        let raw: RawAssessment = serde_json::from_str(json).unwrap();
        assert!(raw.is_converged);
    }

    #[test]
    fn extracts_object_with_braces_inside_strings() {
        let reply = r#"{"is_converged": false, "confidence_score": 0.4, "reasoning": "they argue about {}-style syntax"}"#;
        let json = extract_json_object(reply).unwrap();
        let raw: RawAssessment = serde_json::from_str(json).unwrap();
        assert!(raw.reasoning.contains("{}-style"));
    }

    #[test]
    fn skips_unbalanced_candidates() {
        let reply = "{ broken prefix ... {\"is_converged\": true, \"confidence_score\": 1.0, \"reasoning\": \"ok\"}";
        // The outer brace never closes; the scan must still find the inner object.
        let json = extract_json_object(reply).unwrap();
        assert!(serde_json::from_str::<RawAssessment>(json).is_ok());
    }

    #[test]
    fn missing_fields_and_wrong_types_are_parse_failures() {
        assert!(parse_assessment("no json here at all").is_err());
        assert!(parse_assessment("{\"is_converged\": true}").is_err());
        assert!(parse_assessment(
            "{\"is_converged\": \"yes\", \"confidence_score\": 0.9, \"reasoning\": \"x\"}"
        )
        .is_err());
    }

    #[tokio::test]
    async fn zero_rounds_never_calls_the_model() {
        let session = DebateSession::new(DebateConfig::new(
            "topic",
            vec!["deepseek".to_string(), "gpt-5".to_string()],
        ))
        .unwrap();
        // A client that would fail loudly if called.
        let client = FixedClient {
            outcome: Err(ChatError::Server("must not be called".into())),
        };

        let assessment = evaluate(&client, &session).await;
        assert!(!assessment.is_converged);
        assert_eq!(assessment.confidence_score, 0.0);
        assert!(!assessment.reasoning.contains("failed:"));
    }

    #[tokio::test]
    async fn low_confidence_overrides_claimed_convergence() {
        let client = FixedClient {
            outcome: Ok(
                "{\"is_converged\": true, \"confidence_score\": 0.3, \"reasoning\": \"hmm\"}"
                    .to_string(),
            ),
        };
        let session = session_with_one_round();

        let assessment = evaluate(&client, &session).await;
        assert!(!assessment.is_converged);
        assert_eq!(assessment.confidence_score, 0.3);
    }

    #[tokio::test]
    async fn out_of_range_confidence_is_clamped_before_comparison() {
        let client = FixedClient {
            outcome: Ok(
                "{\"is_converged\": true, \"confidence_score\": 17.0, \"reasoning\": \"sure\"}"
                    .to_string(),
            ),
        };
        let session = session_with_one_round();

        let assessment = evaluate(&client, &session).await;
        assert!(assessment.is_converged);
        assert_eq!(assessment.confidence_score, 1.0);
    }

    #[tokio::test]
    async fn api_failure_yields_conservative_fallback_with_marker() {
        let client = FixedClient {
            outcome: Err(ChatError::Network("connection refused".into())),
        };
        let session = session_with_one_round();

        let assessment = evaluate(&client, &session).await;
        assert!(!assessment.is_converged);
        assert_eq!(assessment.confidence_score, 0.0);
        assert!(assessment.reasoning.contains("failed"));
    }

    #[tokio::test]
    async fn unparsable_reply_yields_conservative_fallback_with_marker() {
        let client = FixedClient {
            outcome: Ok("I feel like they mostly agree?".to_string()),
        };
        let session = session_with_one_round();

        let assessment = evaluate(&client, &session).await;
        assert!(!assessment.is_converged);
        assert_eq!(assessment.confidence_score, 0.0);
        assert!(assessment.reasoning.contains("failed"));
    }

    #[test]
    fn evaluation_prompt_excludes_degraded_responses() {
        let session = session_with_one_round();
        let prompt = build_evaluation_prompt(&session);
        assert!(prompt.contains("[agent deepseek]"));
        assert!(!prompt.contains("[agent gpt-5]"));
        assert!(prompt.contains("Semantic alignment"));
        assert!(prompt.contains("is_converged"));
    }
}
