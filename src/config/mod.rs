//! Configuration for the Voxa server.
//!
//! Configuration comes from environment variables (with `.env` support via
//! dotenvy) on top of defaults, then passes a validation pass. The
//! orchestrator knobs are split into their own struct so a session can be
//! constructed with just [`OrchestratorConfig`] in tests.

mod env;
mod validation;

/// Backchannel phrases recognized as acknowledgements rather than
/// interruptions. Extended (not replaced) by `BACKCHANNEL_PHRASES`.
pub const DEFAULT_BACKCHANNEL_PHRASES: &[&str] = &[
    "uh-huh", "uhuh", "uh huh", "mm-hmm", "mmhmm", "mm hmm", "yeah", "yep", "yup", "okay", "ok",
    "k", "right", "sure", "got it", "i see", "go ahead",
];

/// Per-session orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Audio blobs below this size are treated as silence and never sent
    /// to STT. Codec dependent; ~5 KB covers WebM captures.
    pub stt_min_blob_bytes: usize,
    /// Debounce window before the decision task classifies accumulated
    /// transcripts.
    pub decision_debounce_ms: u64,
    pub stt_job_queue_cap: usize,
    pub text_stream_queue_cap: usize,
    pub audio_output_queue_cap: usize,
    pub backchannel_phrases: Vec<String>,
    pub llm_request_timeout_ms: u64,
    /// Grace window for cancelled tools and stopping workers at teardown.
    pub tool_cancel_grace_ms: u64,
    /// Maximum retained history turns, oldest evicted first. Zero disables
    /// the cap.
    pub max_history_turns: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stt_min_blob_bytes: 5000,
            decision_debounce_ms: 50,
            stt_job_queue_cap: 8,
            text_stream_queue_cap: 50,
            audio_output_queue_cap: 20,
            backchannel_phrases: DEFAULT_BACKCHANNEL_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            llm_request_timeout_ms: 30_000,
            tool_cancel_grace_ms: 2_000,
            max_history_turns: 64,
        }
    }
}

/// Server configuration
///
/// Contains everything needed to run the server: bind address, provider
/// API keys and model selections, and the per-session orchestrator knobs.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Provider API keys
    pub deepgram_api_key: Option<String>,
    pub groq_api_key: Option<String>,

    // Model selection
    pub groq_model: String,
    pub groq_temperature: f32,
    pub stt_model: String,
    pub stt_language: String,
    pub tts_voice: String,
    pub tts_encoding: String,

    /// Optional system prompt override for the agent.
    pub system_prompt: Option<String>,

    pub orchestrator: OrchestratorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            deepgram_api_key: None,
            groq_api_key: None,
            groq_model: "llama-3.3-70b-versatile".to_string(),
            groq_temperature: 0.7,
            stt_model: "nova-2".to_string(),
            stt_language: "en".to_string(),
            tts_voice: "aura-asteria-en".to_string(),
            tts_encoding: "mp3".to_string(),
            system_prompt: None,
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl ServerConfig {
    /// The socket address string to bind to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
