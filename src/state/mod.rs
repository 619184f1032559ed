use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::llm::{GroqLlm, LanguageModel};
use crate::core::stt::{DeepgramStt, SpeechToText};
use crate::core::tools::{ToolRegistry, ToolSet};
use crate::core::tts::{DeepgramTts, TextToSpeech};

/// The provider trio backing one voice session.
pub type SessionProviders = (
    Arc<dyn SpeechToText>,
    Arc<dyn LanguageModel>,
    Arc<dyn TextToSpeech>,
);

/// Application state that can be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self { config })
    }

    /// Build the per-session providers. The LLM is bound to the session's
    /// tool registry so its tool executions are cancellable on
    /// interruption.
    ///
    /// # Errors
    /// Returns a client-presentable message when a required API key is not
    /// configured.
    pub fn build_session_providers(
        &self,
        registry: Arc<ToolRegistry>,
    ) -> Result<SessionProviders, String> {
        let deepgram_key = self
            .config
            .deepgram_api_key
            .clone()
            .ok_or_else(|| "Server configuration error: DEEPGRAM_API_KEY not set".to_string())?;
        let groq_key = self
            .config
            .groq_api_key
            .clone()
            .ok_or_else(|| "Server configuration error: GROQ_API_KEY not set".to_string())?;

        let stt = DeepgramStt::new(
            deepgram_key.clone(),
            self.config.stt_model.clone(),
            self.config.stt_language.clone(),
        )
        .map_err(|e| format!("STT initialization failed: {e}"))?;

        let llm = GroqLlm::new(
            groq_key,
            self.config.groq_model.clone(),
            self.config.groq_temperature,
            self.config.system_prompt.clone(),
            ToolSet::builtin(),
            registry,
        )
        .map_err(|e| format!("LLM initialization failed: {e}"))?;

        let tts = DeepgramTts::new(
            deepgram_key,
            self.config.tts_voice.clone(),
            self.config.tts_encoding.clone(),
        )
        .map_err(|e| format!("TTS initialization failed: {e}"))?;

        Ok((Arc::new(stt), Arc::new(llm), Arc::new(tts)))
    }
}
