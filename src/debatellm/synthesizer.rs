//! Final answer synthesis.
//!
//! Once the round loop ends, the synthesizer model is asked to integrate every
//! participant's viewpoints into one coherent answer. The transcript it receives carries
//! full per-agent attribution plus each round's convergence reasoning where available. If
//! the call fails, a deterministic extractive summary is assembled instead; synthesis
//! never throws and always returns non-empty text.

use crate::client_wrapper::{ClientWrapper, Message, SamplingParams};
use crate::session::DebateSession;

/// Characters of each participant's first usable contribution kept by the fallback.
pub const FALLBACK_EXCERPT_CHARS: usize = 200;

const SYNTHESIZER_SYSTEM_PROMPT: &str =
    "You synthesize the outcome of a multi-agent debate. Consolidate the perspectives \
     neutrally: integrate every participant's viewpoint into one coherent answer, ground \
     every claim in the transcript, and do not introduce material that was never discussed.";

/// Produce the final answer to the debate topic.
///
/// With zero rounds no external call is made. The returned string is never empty.
pub async fn synthesize(client: &dyn ClientWrapper, session: &DebateSession) -> String {
    if session.rounds.is_empty() {
        return format!(
            "No debate rounds were completed for the topic \"{}\", so there is no \
             discussion content to synthesize.",
            session.config.topic
        );
    }

    let messages = vec![
        Message::system(SYNTHESIZER_SYSTEM_PROMPT),
        Message::user(build_synthesis_prompt(session)),
    ];
    let sampling = SamplingParams::default().with_temperature(0.5);

    match client
        .send_message(&session.config.synthesizer_model, &messages, &sampling)
        .await
    {
        Ok(reply) if !reply.content.trim().is_empty() => reply.content,
        Ok(_) => {
            log::warn!(
                "synthesis for session {} returned an empty answer; using extractive fallback",
                session.id
            );
            extractive_fallback(session, "synthesis model returned an empty answer")
        }
        Err(err) => {
            log::warn!(
                "synthesis call for session {} errored: {}; using extractive fallback",
                session.id,
                err
            );
            extractive_fallback(session, &err.to_string())
        }
    }
}

/// Transcribe the whole debate for the synthesis model: every round, every agent, plus
/// convergence reasoning and score where a round carries an assessment.
fn build_synthesis_prompt(session: &DebateSession) -> String {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "Debate topic: {}\n\nFull transcript:\n",
        session.config.topic
    ));

    for round in &session.rounds {
        prompt.push_str(&format!("--- Round {} ---\n", round.round_number));
        for response in &round.responses {
            if response.is_degraded() {
                prompt.push_str(&format!(
                    "[agent {}]: (no response: {})\n",
                    response.model,
                    response.error.as_deref().unwrap_or("unknown failure")
                ));
            } else {
                prompt.push_str(&format!(
                    "[agent {}]: {}\n",
                    response.model, response.content
                ));
            }
        }
        if let Some(assessment) = &round.assessment {
            prompt.push_str(&format!(
                "Moderator assessment (confidence {:.2}): {}\n",
                assessment.confidence_score, assessment.reasoning
            ));
        }
    }

    prompt.push_str(
        "\nWrite the final answer to the debate topic. Integrate all participant \
         viewpoints into one coherent, self-contained answer.\n",
    );

    prompt
}

/// Deterministic fallback when the synthesis call fails: per participant, the first ~200
/// characters of its first non-error, non-empty contribution across all rounds.
pub fn extractive_fallback(session: &DebateSession, failure_reason: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Automatic synthesis was unavailable ({}). Extractive summary of the debate on \
         \"{}\":\n",
        failure_reason, session.config.topic
    ));

    for model in &session.config.participants {
        let excerpt = session
            .rounds
            .iter()
            .flat_map(|round| round.responses.iter())
            .find(|response| {
                response.model == *model
                    && !response.is_degraded()
                    && !response.content.trim().is_empty()
            })
            .map(|response| truncate_chars(&response.content, FALLBACK_EXCERPT_CHARS));

        match excerpt {
            Some(text) => out.push_str(&format!("- {}: {}\n", model, text)),
            None => out.push_str(&format!("- {}: no usable contribution recorded\n", model)),
        }
    }

    out
}

/// Keep at most `max_chars` characters, cutting on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
