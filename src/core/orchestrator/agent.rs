//! The agent runner: consume the LLM token stream, batch complete
//! sentences into the text queue, and commit the finished response to
//! history.
//!
//! Sentences are only handed to TTS once a terminal punctuation arrives,
//! so audio chunks never overlap mid-sentence. The cancel token is checked
//! between tokens; a cancelled run pushes no end-of-utterance sentinel and
//! leaves history untouched. A run whose generation id has been overtaken
//! discards its response entirely.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::llm::{ChatTurn, Role};

use super::queue::TextItem;
use super::status::AgentStatus;
use super::{Orchestrator, ServerEvent};

/// Punctuation that closes a sentence for TTS batching.
const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '\n'];

impl Orchestrator {
    pub(super) async fn run_agent(
        self: Arc<Self>,
        history: Vec<ChatTurn>,
        generation: u64,
        cancel: CancellationToken,
    ) {
        {
            let mut state = self.state.lock().await;
            if state.generation_id != generation {
                debug!("[{}] Run {generation} stale before start", self.session_id);
                return;
            }
            state.response_in_progress = true;
        }

        let request_timeout = Duration::from_millis(self.config.llm_request_timeout_ms);
        let mut stream = match timeout(request_timeout, self.llm.stream(&history)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                self.fail_run(generation, &format!("language model request failed: {e}"))
                    .await;
                return;
            }
            Err(_) => {
                self.fail_run(generation, "language model request timed out")
                    .await;
                return;
            }
        };

        let mut sentence = String::new();
        let mut full_response = String::new();
        let mut streaming = false;

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[{}] Run {generation} cancelled mid-stream", self.session_id);
                    self.restore_idle(generation).await;
                    return;
                }
                item = stream.next() => item,
            };

            match item {
                Some(Ok(token)) => {
                    if !streaming {
                        streaming = true;
                        let mut state = self.state.lock().await;
                        if state.generation_id == generation {
                            state.agent_status = AgentStatus::Streaming;
                        }
                    }
                    full_response.push_str(&token);
                    sentence.push_str(&token);

                    if token.contains(&SENTENCE_TERMINATORS[..]) {
                        let text = sentence.trim().to_string();
                        sentence.clear();
                        if !text.is_empty()
                            && !self.push_sentence(text, generation, &cancel).await
                        {
                            self.restore_idle(generation).await;
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!("[{}] Token stream error: {e}", self.session_id);
                    self.emit(ServerEvent::Error {
                        message: "The agent response was interrupted by a provider error."
                            .to_string(),
                    })
                    .await;
                    break;
                }
                None => break,
            }
        }

        let remainder = sentence.trim().to_string();
        if !remainder.is_empty() && !self.push_sentence(remainder, generation, &cancel).await {
            self.restore_idle(generation).await;
            return;
        }

        // Exactly one sentinel per completed run.
        if self
            .text_stream
            .put(TextItem::EndOfUtterance { generation })
            .await
            .is_err()
        {
            debug!("[{}] Text queue closed before sentinel", self.session_id);
        }

        let mut state = self.state.lock().await;
        let response = full_response.trim();
        if state.generation_id != generation {
            debug!(
                "[{}] Run {generation} finished stale; response discarded",
                self.session_id
            );
            return;
        }

        if response.is_empty() {
            // Nothing will ever play for this run; close the cycle now.
            state.response_in_progress = false;
        } else {
            if state.chat_history.last().map(|t| t.role) == Some(Role::Agent) {
                // Two live runs would be a bug; keep history well-formed.
                warn!(
                    "[{}] Agent turn already at history tail; replacing it",
                    self.session_id
                );
                state.chat_history.pop();
            }
            state.chat_history.push(ChatTurn::agent(response));
            state.truncate_history(self.config.max_history_turns);
            self.emit(ServerEvent::AgentResponse {
                text: response.to_string(),
            })
            .await;
        }
        state.agent_status = AgentStatus::Idle;
        info!(
            "[{}] Run {generation} complete ({} chars)",
            self.session_id,
            response.len()
        );
    }

    /// Queue one finished sentence for synthesis. Returns false if the run
    /// was cancelled or the session is shutting down.
    async fn push_sentence(
        &self,
        text: String,
        generation: u64,
        cancel: &CancellationToken,
    ) -> bool {
        debug!("[{}] Sentence -> TTS: '{text}'", self.session_id);
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("[{}] Cancelled while queueing sentence", self.session_id);
                false
            }
            result = self.text_stream.put(TextItem::Sentence { text, generation }) => result.is_ok(),
        }
    }

    async fn restore_idle(&self, generation: u64) {
        let mut state = self.state.lock().await;
        if state.generation_id == generation {
            state.agent_status = AgentStatus::Idle;
        }
    }

    async fn fail_run(&self, generation: u64, message: &str) {
        warn!("[{}] Agent run failed: {message}", self.session_id);
        self.emit(ServerEvent::Error {
            message: message.to_string(),
        })
        .await;
        let mut state = self.state.lock().await;
        if state.generation_id == generation {
            state.agent_status = AgentStatus::Idle;
            state.response_in_progress = false;
        }
    }
}
