//! Executes one debate round.
//!
//! Builds the shared context for "this" round (the debate framing, the topic, and every
//! prior response attributed to its agent), then queries every participant concurrently.
//! Each participant gets an independent retry budget with exponential backoff; one agent
//! exhausting its attempts never blocks or fails the others.

use std::sync::Arc;
use std::time::Duration;

use crate::client_wrapper::{ChatError, ClientWrapper, Message, SamplingParams};
use crate::session::{AgentResponse, DebateSession};

/// Attempts per participant per round (first try plus retries).
pub const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between attempts; doubles after each failure.
pub const BACKOFF_BASE: Duration = Duration::from_millis(250);

const DEBATE_SYSTEM_PROMPT: &str =
    "You are participating in a structured multi-agent debate with other AI models. \
     Present your position on the topic clearly and with concrete reasoning. \
     Engage with the arguments other agents have made: acknowledge strong points \
     and challenge weak ones.";

/// Build the ordered context every participant of the upcoming round will see.
///
/// The context is a snapshot: it is built once per round and shared verbatim by all
/// participants. Prior responses are attributed with an explicit per-agent tag so every
/// later round has full visibility into everything said before.
pub fn build_round_context(session: &DebateSession) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2 + session.rounds.len() * session.config.participants.len());

    messages.push(Message::system(DEBATE_SYSTEM_PROMPT));
    messages.push(Message::user(format!(
        "The debate topic is: {}",
        session.config.topic
    )));

    for round in &session.rounds {
        for response in &round.responses {
            messages.push(Message::user(format!(
                "[agent {}]: {}",
                response.model, response.content
            )));
        }
    }

    if !session.rounds.is_empty() {
        messages.push(Message::user(
            "Considering the discussion above, respond with your updated position on the topic.",
        ));
    }

    messages
}

/// Query every configured participant concurrently and return their responses in
/// configured participant order, regardless of completion order.
///
/// The returned vector always has exactly one entry per participant; exhausted or
/// unauthorized agents appear as degraded [`AgentResponse`]s.
pub async fn execute_round(
    client: &Arc<dyn ClientWrapper>,
    session: &DebateSession,
    sampling: &SamplingParams,
) -> Vec<AgentResponse> {
    let context = Arc::new(build_round_context(session));

    let mut tasks = Vec::with_capacity(session.config.participants.len());
    for model in &session.config.participants {
        let client = Arc::clone(client);
        let context = Arc::clone(&context);
        let sampling = sampling.clone();
        let model = model.clone();

        tasks.push(tokio::spawn(async move {
            query_with_retry(client.as_ref(), &model, &context, &sampling).await
        }));
    }

    // Joining in spawn order preserves the configured participant order.
    let mut responses = Vec::with_capacity(tasks.len());
    for (task, model) in tasks.into_iter().zip(session.config.participants.iter()) {
        match task.await {
            Ok(response) => responses.push(response),
            Err(join_err) => {
                log::error!("debate round task for agent {} aborted: {}", model, join_err);
                responses.push(AgentResponse::failed(
                    model.clone(),
                    format!("agent task aborted: {}", join_err),
                ));
            }
        }
    }

    responses
}

/// Issue one participant's query, retrying transient failures with doubling backoff.
///
/// Authentication failures short-circuit the remaining attempts. When every attempt fails,
/// the degraded response records the final failure and the attempt count.
async fn query_with_retry(
    client: &dyn ClientWrapper,
    model: &str,
    context: &[Message],
    sampling: &SamplingParams,
) -> AgentResponse {
    let mut delay = BACKOFF_BASE;
    let mut last_error: Option<ChatError> = None;
    let mut attempts_made = 0u32;

    for attempt in 1..=MAX_ATTEMPTS {
        attempts_made = attempt;
        match client.send_message(model, context, sampling).await {
            Ok(reply) => {
                log::debug!(
                    "agent {} responded on attempt {}/{} ({} chars)",
                    model,
                    attempt,
                    MAX_ATTEMPTS,
                    reply.content.len()
                );
                return AgentResponse::ok(model, reply.content);
            }
            Err(err) => {
                log::warn!(
                    "agent {} attempt {}/{} failed: {}",
                    model,
                    attempt,
                    MAX_ATTEMPTS,
                    err
                );
                let retryable = err.is_retryable();
                last_error = Some(err);
                if !retryable {
                    break;
                }
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    let detail = last_error
        .map(|err| err.to_string())
        .unwrap_or_else(|| "unknown error".to_string());
    AgentResponse::failed(
        model,
        format!(
            "agent {} failed after {} attempt(s): {}",
            model, attempts_made, detail
        ),
    )
}
