//! Per-stage status types for the conversation pipeline.
//!
//! Each stage carries its own enum so that illegal combinations (a "Paused"
//! STT stage, a "Streaming" playback stage) are unrepresentable. Status
//! mutations happen only inside the component that owns the stage, with two
//! exceptions: the interruption handler may force the agent back to `Idle`
//! after cancelling it, and the decision task resets all stages before
//! dispatching a new generation.

/// Speech-to-text stage status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttStatus {
    Idle,
    Processing,
}

/// Agent (LLM) stage status.
///
/// `Processing` covers the window between dispatch and the first streamed
/// token; `Streaming` covers active token consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Idle,
    Processing,
    Streaming,
}

impl AgentStatus {
    /// True while a run is dispatched or actively streaming.
    pub fn is_busy(&self) -> bool {
        matches!(self, AgentStatus::Processing | AgentStatus::Streaming)
    }
}

/// Text-to-speech stage status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsStatus {
    Idle,
    Processing,
    Streaming,
}

/// Server-side playback stage status.
///
/// `Paused` is entered only by the interruption handler and is what keeps
/// the egress pump from draining audio that a false alarm may still resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Active,
    Paused,
}

/// Interruption handling status, acting as a soft lock over the decision
/// path: `Processing` while the pause reaction runs, `Active` once the
/// interruption has been handled and a decision is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionStatus {
    Idle,
    Processing,
    Active,
}

impl InterruptionStatus {
    /// True while an interruption is being handled or awaiting its decision.
    pub fn is_engaged(&self) -> bool {
        matches!(
            self,
            InterruptionStatus::Processing | InterruptionStatus::Active
        )
    }
}
