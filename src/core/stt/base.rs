/// Error types for STT operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SttError {
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Provider error ({status}): {message}")]
    ProviderError { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Base trait for post-utterance speech-to-text providers.
///
/// Audio arrives as one complete blob per utterance; there is no streaming
/// transcription at this layer.
#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a complete audio blob.
    ///
    /// # Arguments
    /// * `audio` - Encoded audio bytes (container detected by the provider)
    ///
    /// # Returns
    /// * `Ok(Some(text))` - Recognized speech
    /// * `Ok(None)` - No speech detected
    /// * `Err(SttError)` - Transport or provider failure
    async fn transcribe(&self, audio: &[u8]) -> Result<Option<String>, SttError>;

    /// Get provider-specific information
    fn provider_name(&self) -> &'static str;
}
