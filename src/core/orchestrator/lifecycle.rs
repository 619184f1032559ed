//! Session lifecycle: worker startup and teardown on disconnect.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{Orchestrator, egress, stt_worker, tts_worker};

impl Orchestrator {
    /// Start the long-lived workers for this session.
    pub fn start(self: &Arc<Self>) {
        info!("[{}] Starting session workers", self.session_id);
        let mut workers = self.workers.lock();
        workers.push(tokio::spawn(stt_worker::run(self.clone())));
        workers.push(tokio::spawn(tts_worker::run(self.clone())));
        workers.push(tokio::spawn(egress::run(self.clone())));
    }

    /// Tear the session down: stop workers, cancel in-flight work, drain
    /// queues, and cancel registered tools. Workers that do not stop within
    /// a short grace window are abandoned.
    pub async fn shutdown(&self) {
        info!("[{}] Shutting down session", self.session_id);

        // Closing the queues unblocks every worker's pending get/put.
        self.stt_jobs.close();
        self.text_stream.close();
        self.audio_output.close();

        {
            let mut state = self.state.lock().await;
            state.agent_cancel.cancel();
            if let Some(handle) = state.decision_task.take() {
                handle.abort();
            }
            if let Some(handle) = state.agent_task.take() {
                handle.abort();
            }
            // Unpark the egress pump if it is waiting out a pause.
            self.playback_gate.notify_waiters();
        }

        let cancelled = self.tools.drain();
        if cancelled > 0 {
            debug!("[{}] Cancelled {cancelled} tool(s) at teardown", self.session_id);
        }

        self.stt_jobs.clear();
        self.text_stream.clear();
        self.audio_output.clear();

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        let grace = Duration::from_millis(self.config.tool_cancel_grace_ms);
        for handle in handles {
            let abort = handle.abort_handle();
            if tokio::time::timeout(grace, handle).await.is_err() {
                warn!("[{}] Worker did not stop within grace; aborting", self.session_id);
                abort.abort();
            }
        }

        info!("[{}] Session shut down", self.session_id);
    }
}
