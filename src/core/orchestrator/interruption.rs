//! The "pause" reaction to voice onset.
//!
//! Runs entirely under the session lock so the `stop_playback` frame is
//! serialized before any later `play_audio` of the next generation.

use std::sync::Arc;

use tracing::{debug, info};

use super::status::{AgentStatus, InterruptionStatus, PlaybackStatus};
use super::{Orchestrator, ServerEvent};

impl Orchestrator {
    /// Handle `speech_start`.
    ///
    /// If the system is idle this is the onset of a new turn and nothing
    /// happens; the STT worker will see the audio. Otherwise the response
    /// in flight is paused and partially torn down, and the decision task
    /// later classifies the utterance as a false alarm or a real barge-in.
    pub async fn on_user_starts_speaking(self: &Arc<Self>) {
        let mut state = self.state.lock().await;

        debug!(
            "[{}] speech_start: stt={:?} agent={:?} tts={:?} playback={:?} interruption={:?} \
             client_active={} response_in_progress={}",
            self.session_id,
            state.stt_status,
            state.agent_status,
            state.tts_status,
            state.playback_status,
            state.interruption_status,
            state.client_playback_active,
            state.response_in_progress,
        );

        if state.interruption_status == InterruptionStatus::Active {
            // A second onset with no speech_end in between; already handled.
            debug!("[{}] Interruption already active; ignoring", self.session_id);
            return;
        }

        if state.is_system_idle() {
            info!("[{}] System idle; speech onset starts a new turn", self.session_id);
            return;
        }

        info!("[{}] Interrupt detected", self.session_id);
        state.interruption_status = InterruptionStatus::Processing;
        state.client_was_active_before_interruption = state.client_playback_active;

        // Instant client feedback; the audio kept client-side may still be
        // resumed if this turns out to be a false alarm.
        self.emit(ServerEvent::StopPlayback { message: None }).await;

        let cleared_audio = self.audio_output.clear();
        let cleared_text = self.text_stream.clear();
        if cleared_audio > 0 || cleared_text > 0 {
            debug!(
                "[{}] Cleared {cleared_audio} audio item(s), {cleared_text} pending sentence(s)",
                self.session_id
            );
        }

        match state.agent_status {
            AgentStatus::Processing => {
                // Not yet streaming: cancel outright.
                state.agent_cancel.cancel();
                state.agent_status = AgentStatus::Idle;
                debug!("[{}] Agent cancelled pre-streaming", self.session_id);
            }
            AgentStatus::Streaming => {
                // Let the stream drain into the now-empty queues, but give
                // it the signal so it can exit early.
                state.agent_cancel.cancel();
                debug!("[{}] Agent streaming; cancel signalled", self.session_id);
            }
            AgentStatus::Idle => {}
        }

        let cancelled_tools = self.tools.cancel_all();
        if cancelled_tools > 0 {
            debug!("[{}] Cancelled {cancelled_tools} in-flight tool(s)", self.session_id);
        }

        // Stale transcripts must not collide with the utterance being
        // spoken right now.
        state.stt_outputs.clear();
        let cleared_jobs = self.stt_jobs.clear();
        if cleared_jobs > 0 {
            debug!("[{}] Dropped {cleared_jobs} pending STT job(s)", self.session_id);
        }

        self.set_playback(&mut state, PlaybackStatus::Paused);
        state.client_playback_active = false;
        state.interruption_status = InterruptionStatus::Active;
    }
}
