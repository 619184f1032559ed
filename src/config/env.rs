use std::env;

use super::{OrchestratorConfig, ServerConfig};

fn parse_var<T: std::str::FromStr>(
    name: &str,
    default: T,
) -> Result<T, Box<dyn std::error::Error>>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| format!("Invalid {name}: {e}").into()),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// Reads configuration from environment variables, with sensible
    /// defaults. Also loads from a `.env` file if present using dotenvy.
    ///
    /// # Errors
    /// Returns an error if a variable is malformed or the resulting
    /// configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let defaults = ServerConfig::default();
        let orchestrator_defaults = OrchestratorConfig::default();

        // Server configuration
        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = parse_var("PORT", defaults.port)?;

        // Provider API keys
        let deepgram_api_key = env::var("DEEPGRAM_API_KEY").ok();
        let groq_api_key = env::var("GROQ_API_KEY").ok();

        // Model selection
        let groq_model = env::var("GROQ_MODEL").unwrap_or(defaults.groq_model);
        let groq_temperature = parse_var("GROQ_TEMPERATURE", defaults.groq_temperature)?;
        let stt_model = env::var("STT_MODEL").unwrap_or(defaults.stt_model);
        let stt_language = env::var("STT_LANGUAGE").unwrap_or(defaults.stt_language);
        let tts_voice = env::var("TTS_VOICE").unwrap_or(defaults.tts_voice);
        let tts_encoding = env::var("TTS_ENCODING").unwrap_or(defaults.tts_encoding);
        let system_prompt = env::var("SYSTEM_PROMPT").ok();

        // Orchestrator tuning
        let mut backchannel_phrases = orchestrator_defaults.backchannel_phrases.clone();
        if let Ok(extra) = env::var("BACKCHANNEL_PHRASES") {
            backchannel_phrases.extend(
                extra
                    .split(',')
                    .map(|p| p.trim().to_lowercase())
                    .filter(|p| !p.is_empty()),
            );
        }

        let orchestrator = OrchestratorConfig {
            stt_min_blob_bytes: parse_var(
                "STT_MIN_BLOB_BYTES",
                orchestrator_defaults.stt_min_blob_bytes,
            )?,
            decision_debounce_ms: parse_var(
                "DECISION_DEBOUNCE_MS",
                orchestrator_defaults.decision_debounce_ms,
            )?,
            stt_job_queue_cap: parse_var(
                "STT_JOB_QUEUE_CAP",
                orchestrator_defaults.stt_job_queue_cap,
            )?,
            text_stream_queue_cap: parse_var(
                "TEXT_STREAM_QUEUE_CAP",
                orchestrator_defaults.text_stream_queue_cap,
            )?,
            audio_output_queue_cap: parse_var(
                "AUDIO_OUTPUT_QUEUE_CAP",
                orchestrator_defaults.audio_output_queue_cap,
            )?,
            backchannel_phrases,
            llm_request_timeout_ms: parse_var(
                "LLM_REQUEST_TIMEOUT_MS",
                orchestrator_defaults.llm_request_timeout_ms,
            )?,
            tool_cancel_grace_ms: parse_var(
                "TOOL_CANCEL_GRACE_MS",
                orchestrator_defaults.tool_cancel_grace_ms,
            )?,
            max_history_turns: parse_var(
                "MAX_HISTORY_TURNS",
                orchestrator_defaults.max_history_turns,
            )?,
        };

        let config = Self {
            host,
            port,
            deepgram_api_key,
            groq_api_key,
            groq_model,
            groq_temperature,
            stt_model,
            stt_language,
            tts_voice,
            tts_encoding,
            system_prompt,
            orchestrator,
        };

        config.validate()?;
        Ok(config)
    }
}
