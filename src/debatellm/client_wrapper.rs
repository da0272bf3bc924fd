use async_trait::async_trait;
use std::error::Error;
use std::fmt;

/// A ClientWrapper is a wrapper around a chat-completion LLM backend.
/// It provides the single narrow operation the debate engine consumes: submit a list of
/// role-tagged messages for one named model, with sampling parameters, and receive text or a
/// categorized error. The wrapper keeps no conversation state; every call is self-contained.

/// Represents the possible roles for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Set by the orchestration engine to steer the model's behaviour.
    System,
    /// Content attributed to the user or to other debate participants.
    User,
    /// Content the model itself generated earlier in the exchange.
    Assistant,
}

/// Represents a generic message to be sent to an LLM.
#[derive(Clone, Debug)]
pub struct Message {
    /// The role associated with the message.
    pub role: Role,
    /// The actual content of the message.
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// How many tokens were spent on prompt vs. completion.
#[derive(Clone, Debug, Default)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

/// One completed chat call: the assistant text plus usage counters when the backend
/// reports them.
#[derive(Clone, Debug)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Optional sampling controls forwarded with each request.
#[derive(Clone, Debug, Default)]
pub struct SamplingParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

impl SamplingParams {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Categorized failure returned by a chat backend.
///
/// The category drives the round executor's retry policy: [`ChatError::Unauthorized`] is
/// never retried, everything else is considered transient.
#[derive(Clone, Debug)]
pub enum ChatError {
    /// The API key was rejected (HTTP 401/403).
    Unauthorized(String),
    /// The backend throttled the request (HTTP 429).
    RateLimited(String),
    /// The backend reported an internal failure (HTTP 5xx).
    Server(String),
    /// The request never produced a well-formed response (DNS, TLS, timeouts, ...).
    Network(String),
}

impl ChatError {
    /// Whether the round executor may retry after this failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ChatError::Unauthorized(_))
    }

    /// The human-readable message carried by the error.
    pub fn message(&self) -> &str {
        match self {
            ChatError::Unauthorized(msg)
            | ChatError::RateLimited(msg)
            | ChatError::Server(msg)
            | ChatError::Network(msg) => msg,
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            ChatError::RateLimited(msg) => write!(f, "rate limited: {}", msg),
            ChatError::Server(msg) => write!(f, "server error: {}", msg),
            ChatError::Network(msg) => write!(f, "network error: {}", msg),
        }
    }
}

impl Error for ChatError {}

/// Trait defining the interface to interact with chat-completion LLM services.
///
/// Unlike session-oriented wrappers, the model identifier travels with every call so a single
/// client instance can serve all debate participants, the moderator, and the synthesizer.
#[async_trait]
pub trait ClientWrapper: Send + Sync {
    /// Send a message exchange to the named model and get a response.
    /// - `model`: identifier of the model that should answer.
    /// - `messages`: the full ordered context to send in the request.
    /// - `params`: optional sampling controls.
    async fn send_message(
        &self,
        model: &str,
        messages: &[Message],
        params: &SamplingParams,
    ) -> Result<ChatResponse, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_is_not_retryable() {
        assert!(!ChatError::Unauthorized("bad key".into()).is_retryable());
        assert!(ChatError::RateLimited("slow down".into()).is_retryable());
        assert!(ChatError::Server("boom".into()).is_retryable());
        assert!(ChatError::Network("refused".into()).is_retryable());
    }

    #[test]
    fn display_includes_category_and_message() {
        let err = ChatError::RateLimited("try later".into());
        assert_eq!(err.to_string(), "rate limited: try later");
        assert_eq!(err.message(), "try later");
    }
}
