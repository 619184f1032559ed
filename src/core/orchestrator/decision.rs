//! The decision task: classify what the user's speech meant.
//!
//! Spawned by the STT worker after a transcript lands (at most one live per
//! session), it waits a short debounce window so rapid fragments coalesce,
//! then decides between three outcomes: ignore noise, resolve a false
//! alarm by resuming playback, or fold the utterance into history and
//! dispatch a new agent generation.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::llm::Role;

use super::status::{AgentStatus, InterruptionStatus, PlaybackStatus};
use super::{Orchestrator, PromptGenerator, ServerEvent, SessionState};

impl Orchestrator {
    /// Spawn a decision task unless one is already pending; repeated
    /// transcript arrivals coalesce into the live task's debounce window.
    pub(super) fn spawn_decision_if_needed(self: &Arc<Self>, state: &mut SessionState) {
        if state.decision_live {
            debug!("[{}] Decision task already pending; coalescing", self.session_id);
            return;
        }
        state.decision_live = true;
        let orchestrator = self.clone();
        state.decision_task = Some(tokio::spawn(async move {
            orchestrator.decision_task().await;
        }));
    }

    async fn decision_task(self: Arc<Self>) {
        loop {
            sleep(Duration::from_millis(self.config.decision_debounce_ms)).await;
            let mut state = self.state.lock().await;

            // Busy guard: a run is already in flight and no interruption is
            // awaiting resolution. Fragments stay buffered; the next
            // transcript retriggers us.
            if state.agent_status.is_busy()
                && state.interruption_status != InterruptionStatus::Active
            {
                debug!(
                    "[{}] Decision deferred; agent is {:?}",
                    self.session_id, state.agent_status
                );
                state.decision_live = false;
                return;
            }

            let under_interruption = state.interruption_status.is_engaged();
            let utterance = PromptGenerator::merge(&state.stt_outputs);
            state.stt_outputs.clear();

            if utterance.is_empty() && !under_interruption {
                debug!("[{}] Empty utterance outside interruption; ignoring", self.session_id);
            } else if under_interruption
                && (utterance.is_empty() || self.prompt.is_backchannel(&utterance))
            {
                info!(
                    "[{}] False alarm ('{}'); resolving",
                    self.session_id,
                    if utterance.is_empty() { "<silence>" } else { utterance.as_str() }
                );
                self.resolve_false_alarm(&mut state).await;
            } else {
                info!(
                    "[{}] New input (interruption={under_interruption}): '{utterance}'",
                    self.session_id
                );
                self.prompt
                    .reconcile(&mut state.chat_history, &utterance, under_interruption);
                state.truncate_history(self.config.max_history_turns);
                self.emit(ServerEvent::Transcript { text: utterance }).await;
                self.begin_generation(&mut state).await;
            }

            if state.stt_outputs.is_empty() {
                state.decision_live = false;
                return;
            }
            // Fragments raced in while we were deciding; go around again.
            debug!("[{}] More transcripts arrived; re-debouncing", self.session_id);
        }
    }

    /// Resolve a detected-then-disconfirmed interruption by restoring the
    /// playback state the client had before the onset.
    async fn resolve_false_alarm(self: &Arc<Self>, state: &mut SessionState) {
        let has_queued_audio = self.audio_output.has_items();

        match state.playback_status {
            PlaybackStatus::Paused => {
                self.emit(ServerEvent::PlaybackResume).await;
                if has_queued_audio {
                    self.set_playback(state, PlaybackStatus::Active);
                } else {
                    // Nothing left server-side; the client drains what it
                    // kept and reports completion.
                    self.set_playback(state, PlaybackStatus::Idle);
                }
                state.client_playback_active = true;
            }
            PlaybackStatus::Idle if state.client_was_active_before_interruption => {
                // Server already finished; the client decides what its own
                // queue still holds.
                self.emit(ServerEvent::PlaybackResume).await;
            }
            PlaybackStatus::Idle => {
                // No playback anywhere. If a user turn is still waiting at
                // the history tail the cancelled run never answered it;
                // regenerate from that tail.
                if state.chat_history.last().map(|t| t.role) == Some(Role::User) {
                    info!(
                        "[{}] False alarm with unanswered user turn; regenerating",
                        self.session_id
                    );
                    self.emit(ServerEvent::PlaybackReset).await;
                    self.begin_generation(state).await;
                    return;
                }
                debug!("[{}] False alarm with nothing to resume", self.session_id);
            }
            PlaybackStatus::Active => {
                debug!("[{}] Playback already active; no egress needed", self.session_id);
            }
        }

        state.interruption_status = InterruptionStatus::Idle;
        state.client_was_active_before_interruption = false;
    }

    /// Reset the pipeline for a fresh response and dispatch the agent
    /// runner against a snapshot of the history.
    pub(super) async fn begin_generation(self: &Arc<Self>, state: &mut SessionState) {
        state.stt_outputs.clear();

        // Stop any straggler run; its outputs are stale-tagged anyway.
        state.agent_cancel.cancel();
        state.agent_cancel = CancellationToken::new();

        let cleared_audio = self.audio_output.clear();
        let cleared_text = self.text_stream.clear();
        if cleared_audio > 0 || cleared_text > 0 {
            debug!(
                "[{}] Cleared {cleared_audio} audio item(s), {cleared_text} sentence(s) before new run",
                self.session_id
            );
        }

        state.generation_id += 1;
        self.set_playback(state, PlaybackStatus::Idle);
        state.agent_status = AgentStatus::Processing;
        state.interruption_status = InterruptionStatus::Idle;
        state.client_was_active_before_interruption = false;
        state.response_in_progress = false;

        let history = state.chat_history.clone();
        let generation = state.generation_id;
        let cancel = state.agent_cancel.clone();
        let orchestrator = self.clone();
        info!(
            "[{}] Dispatching agent run (generation {generation}, {} turn(s))",
            self.session_id,
            history.len()
        );
        state.agent_task = Some(tokio::spawn(async move {
            orchestrator.run_agent(history, generation, cancel).await;
        }));
    }
}
