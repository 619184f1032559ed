use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

/// Role of a chat history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One turn of the per-session conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
        }
    }
}

/// Error types for LLM operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Request timed out")]
    Timeout,
}

/// Stream of text tokens produced by a language model.
///
/// Tool calls are resolved inside the provider, so consumers see one linear
/// token stream per response. Dropping the stream is the cooperative cancel
/// signal for the provider side.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Base trait for streaming language model providers.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Start a streaming completion for the given chat history.
    ///
    /// # Arguments
    /// * `history` - Ordered conversation turns, oldest first
    ///
    /// # Returns
    /// * `Result<TokenStream, LlmError>` - Token stream or error
    async fn stream(&self, history: &[ChatTurn]) -> Result<TokenStream, LlmError>;

    /// Get provider-specific information
    fn provider_name(&self) -> &'static str;
}
