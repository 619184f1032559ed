use bytes::Bytes;

/// Error types for TTS operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum TtsError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Base trait for sentence-at-a-time speech synthesis providers.
#[async_trait::async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize one sentence into encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Bytes, TtsError>;

    /// Get provider-specific information
    fn provider_name(&self) -> &'static str;
}
