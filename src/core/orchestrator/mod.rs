//! Per-connection conversation orchestrator.
//!
//! Each WebSocket session owns one [`Orchestrator`]: the state machine that
//! coordinates STT, the streaming agent, TTS, and client playback through
//! bounded queues, and that runs the pause-and-decide interruption
//! protocol. Nothing here is shared across sessions.
//!
//! Pipeline (forward): client audio → STT job queue → STT worker →
//! transcript list → decision task → chat history → agent runner → text
//! stream queue → TTS worker → audio output queue → egress pump → client.
//!
//! Interruption (backward): `speech_start` → interruption handler →
//! cancel agent / clear queues / cancel tools → `stop_playback`.

mod agent;
mod decision;
mod egress;
pub mod events;
mod interruption;
mod lifecycle;
pub mod prompt;
pub mod queue;
pub mod session;
pub mod status;
mod stt_worker;
mod tts_worker;

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::core::llm::LanguageModel;
use crate::core::stt::SpeechToText;
use crate::core::tools::ToolRegistry;
use crate::core::tts::TextToSpeech;

pub use events::{ClientEvent, ServerEvent};
pub use prompt::PromptGenerator;
pub use queue::{AudioItem, BoundedQueue, QueueClosed, TextItem};
pub use session::SessionState;
pub use status::{AgentStatus, InterruptionStatus, PlaybackStatus, SttStatus, TtsStatus};

/// The per-session orchestrator.
///
/// Shared mutable state lives in [`SessionState`] behind one async mutex;
/// every event handler and worker reads and mutates it under that lock.
/// The queues are internally synchronized and sit outside the lock so a
/// blocked producer never holds it.
pub struct Orchestrator {
    session_id: String,
    config: OrchestratorConfig,
    prompt: PromptGenerator,
    state: tokio::sync::Mutex<SessionState>,

    stt_jobs: BoundedQueue<Bytes>,
    text_stream: BoundedQueue<TextItem>,
    audio_output: BoundedQueue<AudioItem>,

    outbound: mpsc::Sender<ServerEvent>,
    tools: Arc<ToolRegistry>,
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn TextToSpeech>,

    /// Woken whenever `playback_status` changes; the egress pump parks on
    /// it while playback is paused.
    playback_gate: Notify,
    workers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn LanguageModel>,
        tts: Arc<dyn TextToSpeech>,
        tools: Arc<ToolRegistry>,
        outbound: mpsc::Sender<ServerEvent>,
    ) -> Arc<Self> {
        let session_id = Uuid::new_v4().to_string()[..8].to_string();
        let prompt = PromptGenerator::new(&config.backchannel_phrases);
        Arc::new(Self {
            session_id,
            stt_jobs: BoundedQueue::new(config.stt_job_queue_cap),
            text_stream: BoundedQueue::new(config.text_stream_queue_cap),
            audio_output: BoundedQueue::new(config.audio_output_queue_cap),
            config,
            prompt,
            state: tokio::sync::Mutex::new(SessionState::new()),
            outbound,
            tools,
            stt,
            llm,
            tts,
            playback_gate: Notify::new(),
            workers: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn tool_registry(&self) -> Arc<ToolRegistry> {
        self.tools.clone()
    }

    /// True when no stage is active and no response cycle is open, read
    /// under the session lock for a consistent snapshot.
    pub async fn is_system_idle(&self) -> bool {
        self.state.lock().await.is_system_idle()
    }

    /// Snapshot of the conversation history.
    pub async fn history_snapshot(&self) -> Vec<crate::core::llm::ChatTurn> {
        self.state.lock().await.chat_history.clone()
    }

    /// Current server-side playback stage.
    pub async fn playback_status(&self) -> PlaybackStatus {
        self.state.lock().await.playback_status
    }

    /// Route one inbound client frame to its handler.
    pub async fn handle_client_event(self: &Arc<Self>, event: ClientEvent) {
        match event {
            ClientEvent::SpeechStart => self.on_user_starts_speaking().await,
            ClientEvent::SpeechEnd { audio, .. } => match BASE64.decode(audio.as_bytes()) {
                Ok(bytes) if !bytes.is_empty() => {
                    self.on_user_ends_speaking(Bytes::from(bytes)).await;
                }
                Ok(_) => warn!("[{}] speech_end carried no audio", self.session_id),
                Err(e) => {
                    warn!("[{}] Ignoring speech_end with invalid base64: {e}", self.session_id);
                }
            },
            ClientEvent::ClientPlaybackStarted => {
                let mut state = self.state.lock().await;
                state.client_playback_active = true;
                debug!("[{}] Client playback active", self.session_id);
            }
            ClientEvent::ClientPlaybackComplete => {
                let mut state = self.state.lock().await;
                state.client_playback_active = false;
                if state.playback_status == PlaybackStatus::Active {
                    self.set_playback(&mut state, PlaybackStatus::Idle);
                }
                // Only close the response cycle if no new one has started.
                if state.agent_status == AgentStatus::Idle {
                    state.response_in_progress = false;
                }
                debug!(
                    "[{}] Client playback complete (response_in_progress={})",
                    self.session_id, state.response_in_progress
                );
            }
        }
    }

    /// Enqueue the finished utterance for transcription. The STT worker and
    /// decision task take over from here.
    pub async fn on_user_ends_speaking(&self, audio: Bytes) {
        debug!(
            "[{}] User finished speaking ({} bytes buffered)",
            self.session_id,
            audio.len()
        );
        if self.stt_jobs.put(audio).await.is_err() {
            debug!("[{}] STT job queue closed; dropping audio", self.session_id);
        }
    }

    /// Send one frame to the client. A closed channel means the connection
    /// is going away; the frame is dropped quietly.
    pub(crate) async fn emit(&self, event: ServerEvent) {
        if self.outbound.send(event).await.is_err() {
            debug!("[{}] Outbound channel closed; frame dropped", self.session_id);
        }
    }

    /// Change the playback stage and wake the egress pump.
    pub(crate) fn set_playback(&self, state: &mut SessionState, status: PlaybackStatus) {
        if state.playback_status != status {
            debug!(
                "[{}] Playback {:?} -> {:?}",
                self.session_id, state.playback_status, status
            );
            state.playback_status = status;
            self.playback_gate.notify_waiters();
        }
    }
}
