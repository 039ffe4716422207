//! Model transport - maps a transcript plus tool catalogue to one model turn.

mod anthropic;

pub use anthropic::AnthropicClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::agent::transcript::{ModelUtterance, Transcript};
use crate::tools::ToolDefinition;

/// Failure talking to the model transport.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport failure (connect, timeout, body read)
    #[error("model transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The model API answered with an error status
    #[error("model API returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The model API answered successfully but the payload made no sense
    #[error("unexpected model response: {0}")]
    UnexpectedResponse(String),
}

impl LlmError {
    /// Whether the failure is worth retrying with backoff. Overload and
    /// rate-limit statuses are; auth and request-shape errors are not.
    pub fn retryable(&self) -> bool {
        match self {
            LlmError::Transport(e) => e.is_timeout() || e.is_connect(),
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::UnexpectedResponse(_) => false,
        }
    }
}

/// A remote model that selects tools.
///
/// One call is one model round-trip: the full transcript and the tool
/// catalogue go out, exactly one utterance comes back.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn converse(
        &self,
        system_prompt: &str,
        transcript: &Transcript,
        tools: &[ToolDefinition],
    ) -> Result<ModelUtterance, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_and_rate_limit_are_retryable() {
        assert!(LlmError::Api {
            status: 529,
            message: "overloaded".to_string()
        }
        .retryable());
        assert!(LlmError::Api {
            status: 429,
            message: "rate limited".to_string()
        }
        .retryable());
    }

    #[test]
    fn auth_and_parse_failures_are_not_retryable() {
        assert!(!LlmError::Api {
            status: 401,
            message: "bad key".to_string()
        }
        .retryable());
        assert!(!LlmError::UnexpectedResponse("no content".to_string()).retryable());
    }
}
