//! The `OpenAIClient` struct implements `ClientWrapper` for OpenAI's Chat Completions API
//! and for any OpenAI-compatible endpoint (xAI, DeepSeek, self-hosted gateways) via
//! [`OpenAIClient::new_with_base_url`].
//!
//! The model identifier is not baked into the client; it is supplied with every
//! `send_message` call, so one client instance can serve every debate participant as long
//! as they are routed through the same gateway.
//!
//! # Example
//!
//! ```rust,no_run
//! use debatellm::clients::openai::OpenAIClient;
//! use debatellm::client_wrapper::{ClientWrapper, Message, SamplingParams};
//!
//! #[tokio::main]
//! async fn main() {
//!     let secret_key = std::env::var("OPEN_AI_SECRET").expect("OPEN_AI_SECRET not set");
//!     let client = OpenAIClient::new(&secret_key);
//!
//!     let resp = client
//!         .send_message(
//!             "gpt-5",
//!             &[
//!                 Message::system("You are an assistant."),
//!                 Message::user("Hello!"),
//!             ],
//!             &SamplingParams::default().with_temperature(0.7),
//!         )
//!         .await
//!         .unwrap();
//!     println!("Assistant: {}", resp.content);
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use openai_rust::chat;
use openai_rust2 as openai_rust;

use crate::client_wrapper::{
    ChatError, ChatResponse, ClientWrapper, Message, Role, SamplingParams, TokenUsage,
};

/// Client wrapper for OpenAI-compatible chat-completion endpoints.
///
/// Reuses one pooled `reqwest` client per instance so that TCP connections and TLS
/// handshakes are shared across the many concurrent requests a debate round issues.
pub struct OpenAIClient {
    /// Underlying SDK client pointing at the REST endpoint.
    client: openai_rust::Client,
}

/// Build the HTTP client shared by all requests issued through one `OpenAIClient`.
fn build_http_client() -> reqwest::Client {
    reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .timeout(Duration::from_secs(300))
        .build()
        .expect("Failed to build HTTP client")
}

impl OpenAIClient {
    /// Construct a new client against the official OpenAI endpoint.
    pub fn new(secret_key: &str) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client(secret_key, build_http_client()),
        }
    }

    /// Construct a client targeting a custom OpenAI-compatible base URL.
    pub fn new_with_base_url(secret_key: &str, base_url: &str) -> Self {
        OpenAIClient {
            client: openai_rust::Client::new_with_client_and_base_url(
                secret_key,
                build_http_client(),
                base_url,
            ),
        }
    }
}

/// Map a transport/SDK failure into the categorized [`ChatError`] taxonomy.
///
/// The SDK surfaces HTTP failures as formatted strings, so classification inspects the
/// rendered message. Anything unrecognized is treated as a network failure, which keeps it
/// retryable.
fn classify_api_error(rendered: String) -> ChatError {
    let lowered = rendered.to_lowercase();
    if lowered.contains("401")
        || lowered.contains("403")
        || lowered.contains("unauthorized")
        || lowered.contains("invalid api key")
    {
        ChatError::Unauthorized(rendered)
    } else if lowered.contains("429") || lowered.contains("rate limit") {
        ChatError::RateLimited(rendered)
    } else if lowered.contains("500")
        || lowered.contains("502")
        || lowered.contains("503")
        || lowered.contains("internal server error")
    {
        ChatError::Server(rendered)
    } else {
        ChatError::Network(rendered)
    }
}

#[async_trait]
impl ClientWrapper for OpenAIClient {
    async fn send_message(
        &self,
        model: &str,
        messages: &[Message],
        params: &SamplingParams,
    ) -> Result<ChatResponse, ChatError> {
        // Convert the provided messages into the format expected by openai_rust
        let mut formatted_messages = Vec::with_capacity(messages.len());
        for msg in messages {
            formatted_messages.push(chat::Message {
                role: match msg.role {
                    Role::System => "system".to_owned(),
                    Role::User => "user".to_owned(),
                    Role::Assistant => "assistant".to_owned(),
                },
                content: msg.content.clone(),
            });
        }

        let mut chat_arguments = chat::ChatArguments::new(model, formatted_messages);
        chat_arguments.temperature = params.temperature;
        chat_arguments.max_tokens = params.max_tokens.map(|m| m as u32);

        let url_path = Some("/v1/chat/completions".to_string());

        let response = self
            .client
            .create_chat(chat_arguments, url_path)
            .await
            .map_err(|err| {
                log::error!(
                    "OpenAIClient::send_message({}): API error: {}",
                    model,
                    err
                );
                classify_api_error(err.to_string())
            })?;

        let usage = TokenUsage {
            input_tokens: response.usage.prompt_tokens as usize,
            output_tokens: response.usage.completion_tokens as usize,
            total_tokens: response.usage.total_tokens as usize,
        };

        let content = response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(ChatResponse {
            content,
            usage: Some(usage),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_auth_failures() {
        match classify_api_error("HTTP 401 Unauthorized: invalid api key".into()) {
            ChatError::Unauthorized(_) => {}
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn classifies_rate_limit_and_server_failures() {
        assert!(matches!(
            classify_api_error("HTTP 429: rate limit exceeded".into()),
            ChatError::RateLimited(_)
        ));
        assert!(matches!(
            classify_api_error("HTTP 503 Service Unavailable".into()),
            ChatError::Server(_)
        ));
    }

    #[test]
    fn unknown_failures_stay_retryable() {
        let err = classify_api_error("connection reset by peer".into());
        assert!(matches!(err, ChatError::Network(_)));
        assert!(err.is_retryable());
    }
}
