//! The STT worker: drain the job queue, transcribe, trigger decisions.
//!
//! One long-lived task per session. Failures are contained here: a failed
//! or empty transcription never touches peer components, it only decides
//! whether the decision task needs to run (it does under an interruption,
//! where silence means false alarm).

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::Orchestrator;
use super::status::SttStatus;

pub(super) async fn run(orchestrator: Arc<Orchestrator>) {
    debug!("[{}] STT worker started", orchestrator.session_id());
    while let Some(blob) = orchestrator.stt_jobs.get().await {
        orchestrator.process_stt_job(blob).await;
    }
    debug!("[{}] STT worker stopped", orchestrator.session_id());
}

impl Orchestrator {
    async fn process_stt_job(self: &Arc<Self>, blob: Bytes) {
        let transcript = if blob.len() < self.config.stt_min_blob_bytes {
            // Too small to be real speech; treat as silence.
            debug!(
                "[{}] Audio blob below threshold ({} < {} bytes); skipping STT",
                self.session_id,
                blob.len(),
                self.config.stt_min_blob_bytes
            );
            None
        } else {
            {
                let mut state = self.state.lock().await;
                state.stt_status = SttStatus::Processing;
            }
            let result = self.stt.transcribe(&blob).await;
            {
                let mut state = self.state.lock().await;
                state.stt_status = SttStatus::Idle;
            }
            match result {
                Ok(text) => text,
                Err(e) => {
                    warn!("[{}] Transcription failed: {e}", self.session_id);
                    None
                }
            }
        };

        let mut state = self.state.lock().await;
        match transcript {
            Some(text) if !text.trim().is_empty() => {
                info!("[{}] Transcript: '{text}'", self.session_id);
                state.stt_outputs.push(text);
                self.spawn_decision_if_needed(&mut state);
            }
            _ => {
                if state.interruption_status.is_engaged() {
                    // Silence after an onset: the decision task resolves the
                    // false alarm.
                    debug!(
                        "[{}] No speech found under interruption; scheduling decision",
                        self.session_id
                    );
                    self.spawn_decision_if_needed(&mut state);
                } else {
                    debug!("[{}] No speech found; ignoring noise", self.session_id);
                }
            }
        }
    }
}
