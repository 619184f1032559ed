//! The TTS worker: synthesize queued sentences into audio items.
//!
//! Sentences come in generation-tagged; the sentinel is forwarded to the
//! audio queue so the egress pump can observe end-of-utterance. A failed
//! synthesis drops that sentence and moves on; the turn keeps flowing.

use std::sync::Arc;

use tracing::{debug, warn};

use super::Orchestrator;
use super::queue::{AudioItem, TextItem};
use super::status::TtsStatus;

pub(super) async fn run(orchestrator: Arc<Orchestrator>) {
    debug!("[{}] TTS worker started", orchestrator.session_id());
    while let Some(item) = orchestrator.text_stream.get().await {
        match item {
            TextItem::EndOfUtterance { generation } => {
                if orchestrator
                    .audio_output
                    .put(AudioItem::EndOfUtterance { generation })
                    .await
                    .is_err()
                {
                    break;
                }
                let mut state = orchestrator.state.lock().await;
                state.tts_status = TtsStatus::Idle;
            }
            TextItem::Sentence { text, generation } => {
                {
                    let mut state = orchestrator.state.lock().await;
                    state.tts_status = TtsStatus::Processing;
                }

                match orchestrator.tts.synthesize(&text).await {
                    Ok(audio) => {
                        debug!(
                            "[{}] Synthesized {} bytes for '{text}'",
                            orchestrator.session_id(),
                            audio.len()
                        );
                        if orchestrator
                            .audio_output
                            .put(AudioItem::Chunk { audio, generation })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        // Drop the sentence, keep the turn going.
                        warn!(
                            "[{}] Synthesis failed for '{text}': {e}",
                            orchestrator.session_id()
                        );
                    }
                }

                let mut state = orchestrator.state.lock().await;
                state.tts_status = if orchestrator.text_stream.has_items() {
                    TtsStatus::Streaming
                } else {
                    TtsStatus::Idle
                };
            }
        }
    }
    debug!("[{}] TTS worker stopped", orchestrator.session_id());
}
