//! Per-session mutable state.
//!
//! One `SessionState` lives behind the session mutex in the orchestrator.
//! Every control decision reads and writes it under that lock, so the
//! system-idle predicate and the invariants around it always observe a
//! consistent snapshot.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::llm::ChatTurn;

use super::status::{AgentStatus, InterruptionStatus, PlaybackStatus, SttStatus, TtsStatus};

pub struct SessionState {
    pub stt_status: SttStatus,
    pub agent_status: AgentStatus,
    pub tts_status: TtsStatus,
    pub playback_status: PlaybackStatus,
    pub interruption_status: InterruptionStatus,

    /// Mirror of the client's playback, driven exclusively by the inbound
    /// `client_playback_started` / `client_playback_complete` events.
    pub client_playback_active: bool,
    /// Snapshot taken at speech-start, consulted by the false-alarm path.
    pub client_was_active_before_interruption: bool,
    /// True from agent dispatch until the client reports playback complete.
    pub response_in_progress: bool,

    /// Monotonic id stamped on each agent run; stale outputs are discarded.
    pub generation_id: u64,
    /// Generation whose audio the egress pump last forwarded.
    pub audio_generation_tag: u64,

    /// Transcript fragments accumulated since the last decision.
    pub stt_outputs: Vec<String>,
    pub chat_history: Vec<ChatTurn>,

    /// Cancellation signal for the current agent run; replaced per run.
    pub agent_cancel: CancellationToken,
    /// True while a decision task is pending or running. Flipped only under
    /// the session lock, so a transcript append and the decision's final
    /// not-more-work check can never miss each other.
    pub decision_live: bool,
    pub decision_task: Option<JoinHandle<()>>,
    pub agent_task: Option<JoinHandle<()>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            stt_status: SttStatus::Idle,
            agent_status: AgentStatus::Idle,
            tts_status: TtsStatus::Idle,
            playback_status: PlaybackStatus::Idle,
            interruption_status: InterruptionStatus::Idle,
            client_playback_active: false,
            client_was_active_before_interruption: false,
            response_in_progress: false,
            generation_id: 0,
            audio_generation_tag: 0,
            stt_outputs: Vec::new(),
            chat_history: Vec::new(),
            agent_cancel: CancellationToken::new(),
            decision_live: false,
            decision_task: None,
            agent_task: None,
        }
    }

    /// True only when no stage is active, the client reports no playback,
    /// and no response cycle is open. Distinguishes a new turn from an
    /// interruption at speech-start.
    pub fn is_system_idle(&self) -> bool {
        self.stt_status == SttStatus::Idle
            && self.agent_status == AgentStatus::Idle
            && self.tts_status == TtsStatus::Idle
            && self.playback_status == PlaybackStatus::Idle
            && !self.client_playback_active
            && !self.response_in_progress
    }

    /// Evict oldest turns beyond `max_turns`. Keeping the newest suffix is
    /// the only truncation compatible with append-on-interrupt
    /// reconciliation, which always rewrites the history tail.
    pub fn truncate_history(&mut self, max_turns: usize) {
        if max_turns > 0 && self.chat_history.len() > max_turns {
            let excess = self.chat_history.len() - max_turns;
            self.chat_history.drain(..excess);
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_session_is_idle() {
        assert!(SessionState::new().is_system_idle());
    }

    #[test]
    fn test_any_active_stage_breaks_idle() {
        let mut state = SessionState::new();
        state.stt_status = SttStatus::Processing;
        assert!(!state.is_system_idle());

        let mut state = SessionState::new();
        state.agent_status = AgentStatus::Streaming;
        assert!(!state.is_system_idle());

        let mut state = SessionState::new();
        state.playback_status = PlaybackStatus::Paused;
        assert!(!state.is_system_idle());

        let mut state = SessionState::new();
        state.client_playback_active = true;
        assert!(!state.is_system_idle());

        let mut state = SessionState::new();
        state.response_in_progress = true;
        assert!(!state.is_system_idle());
    }

    #[test]
    fn test_truncate_history_keeps_newest_turns() {
        let mut state = SessionState::new();
        for i in 0..6 {
            state.chat_history.push(ChatTurn::user(format!("turn {i}")));
        }
        state.truncate_history(4);
        assert_eq!(state.chat_history.len(), 4);
        assert_eq!(state.chat_history[0].content, "turn 2");

        // Zero disables the cap.
        state.truncate_history(0);
        assert_eq!(state.chat_history.len(), 4);
    }
}
