//! The egress pump: forward synthesized audio to the client.
//!
//! Holds the session lock while emitting `play_audio`, so frame order is
//! serialized against `stop_playback` from the interruption handler. While
//! playback is paused the pump parks without dequeuing, preserving queued
//! audio for a false-alarm resume. Items from an overtaken generation are
//! dropped here, which is what makes stale audio unobservable after a
//! barge-in.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

use super::queue::AudioItem;
use super::status::PlaybackStatus;
use super::{Orchestrator, ServerEvent};

pub(super) async fn run(orchestrator: Arc<Orchestrator>) {
    debug!("[{}] Egress pump started", orchestrator.session_id());
    loop {
        // Park while paused; queued audio may still be resumed.
        loop {
            let notified = orchestrator.playback_gate.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = orchestrator.state.lock().await;
                if state.playback_status != PlaybackStatus::Paused {
                    break;
                }
            }
            if orchestrator.audio_output.is_closed() {
                debug!("[{}] Egress pump stopped", orchestrator.session_id());
                return;
            }
            notified.await;
        }

        let Some(item) = orchestrator.audio_output.get().await else {
            break;
        };

        match item {
            AudioItem::EndOfUtterance { generation } => {
                // Playback state is left alone; the client reports
                // completion when its queue drains.
                debug!(
                    "[{}] End of utterance for generation {generation}",
                    orchestrator.session_id()
                );
            }
            AudioItem::Chunk { audio, generation } => {
                let mut state = orchestrator.state.lock().await;
                if generation != state.generation_id {
                    debug!(
                        "[{}] Dropping stale audio (generation {generation} < {})",
                        orchestrator.session_id(),
                        state.generation_id
                    );
                    continue;
                }
                if state.playback_status == PlaybackStatus::Paused {
                    // Paused between dequeue and here; the interruption
                    // already cleared the queue, this chunk goes with it.
                    continue;
                }
                if state.playback_status == PlaybackStatus::Idle {
                    orchestrator.set_playback(&mut state, PlaybackStatus::Active);
                }
                state.audio_generation_tag = generation;

                let frame = ServerEvent::PlayAudio {
                    audio: BASE64.encode(&audio),
                };
                debug!(
                    "[{}] play_audio ({} bytes, generation {generation})",
                    orchestrator.session_id(),
                    audio.len()
                );
                orchestrator.emit(frame).await;
            }
        }
    }
    debug!("[{}] Egress pump stopped", orchestrator.session_id());
}
