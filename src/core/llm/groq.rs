//! Groq chat-completions streaming provider.
//!
//! Streams tokens over SSE and resolves tool calls internally: when the
//! model finishes a round with `tool_calls`, the requested tools are
//! dispatched through the session's registry-aware tool set, their results
//! appended as `tool` messages, and the conversation re-submitted. The
//! consumer sees one linear token stream; dropping it stops the loop at the
//! next send.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::tools::{ToolInvocation, ToolRegistry, ToolSet};

use super::base::{ChatTurn, LanguageModel, LlmError, Role, TokenStream};

const GROQ_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Upper bound on model→tools→model rounds per response. The final round is
/// forced tool-free so the loop always terminates with spoken output.
const MAX_TOOL_ROUNDS: usize = 4;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, friendly voice assistant. \
    Keep responses short and conversational, as they will be spoken aloud; \
    aim for two or three sentences unless more detail is requested. \
    Prefer answering directly and only use tools when they are needed.";

/// Tool call accumulated from streamed deltas.
#[derive(Debug, Default, Clone)]
struct PendingToolCall {
    index: u64,
    id: String,
    name: String,
    arguments: String,
}

struct RequestContext {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    tools: ToolSet,
    invocation: ToolInvocation,
}

/// Groq LLM provider. One instance per session: it carries the session's
/// tool registry so tool executions are cancellable by the interruption
/// handler.
pub struct GroqLlm {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    system_prompt: String,
    tools: ToolSet,
    registry: Arc<ToolRegistry>,
}

impl GroqLlm {
    pub fn new(
        api_key: String,
        model: String,
        temperature: f32,
        system_prompt: Option<String>,
        tools: ToolSet,
        registry: Arc<ToolRegistry>,
    ) -> Result<Self, LlmError> {
        if api_key.is_empty() {
            return Err(LlmError::ConfigurationError(
                "Groq API key is empty".to_string(),
            ));
        }
        let client = reqwest::Client::new();
        Ok(Self {
            client,
            api_key,
            model,
            temperature,
            system_prompt: system_prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            tools,
            registry,
        })
    }

    fn build_messages(&self, history: &[ChatTurn]) -> Vec<Value> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(json!({ "role": "system", "content": self.system_prompt }));
        for turn in history {
            let role = match turn.role {
                Role::User => "user",
                Role::Agent => "assistant",
            };
            messages.push(json!({ "role": role, "content": turn.content }));
        }
        messages
    }
}

#[async_trait::async_trait]
impl LanguageModel for GroqLlm {
    async fn stream(&self, history: &[ChatTurn]) -> Result<TokenStream, LlmError> {
        let messages = self.build_messages(history);
        let (tx, rx) = mpsc::channel(64);

        let ctx = RequestContext {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            tools: self.tools.clone(),
            invocation: ToolInvocation {
                registry: self.registry.clone(),
            },
        };
        tokio::spawn(completion_loop(ctx, messages, tx));

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(Box::pin(stream))
    }

    fn provider_name(&self) -> &'static str {
        "groq"
    }
}

/// Drive the model→tools→model loop, forwarding content tokens to `tx`.
/// Returns silently when the consumer drops the stream.
async fn completion_loop(
    ctx: RequestContext,
    mut messages: Vec<Value>,
    tx: mpsc::Sender<Result<String, LlmError>>,
) {
    for round in 0..=MAX_TOOL_ROUNDS {
        let mut body = json!({
            "model": ctx.model,
            "messages": messages,
            "temperature": ctx.temperature,
            "stream": true,
        });
        if !ctx.tools.is_empty() && round < MAX_TOOL_ROUNDS {
            body["tools"] = Value::Array(ctx.tools.definitions());
            body["tool_choice"] = json!("auto");
        }

        let response = match ctx
            .client
            .post(GROQ_COMPLETIONS_URL)
            .bearer_auth(&ctx.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let _ = tx.send(Err(LlmError::RequestFailed(e.to_string()))).await;
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Groq request failed ({status}): {message}");
            let _ = tx
                .send(Err(LlmError::ProviderError {
                    status: status.as_u16(),
                    message,
                }))
                .await;
            return;
        }

        let mut byte_stream = response.bytes_stream();
        let mut line_buf = String::new();
        let mut pending_calls: Vec<PendingToolCall> = Vec::new();
        let mut finish_reason: Option<String> = None;

        'sse: while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = tx.send(Err(LlmError::RequestFailed(e.to_string()))).await;
                    return;
                }
            };
            line_buf.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = line_buf.find('\n') {
                let line: String = line_buf.drain(..=pos).collect();
                let Some(data) = line.trim().strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    break 'sse;
                }
                let event: Value = match serde_json::from_str(data) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!("Skipping unparseable SSE event: {e}");
                        continue;
                    }
                };

                let choice = &event["choices"][0];
                if let Some(reason) = choice["finish_reason"].as_str() {
                    finish_reason = Some(reason.to_string());
                }

                let delta = &choice["delta"];
                if let Some(token) = delta["content"].as_str() {
                    if !token.is_empty() && tx.send(Ok(token.to_string())).await.is_err() {
                        debug!("Token consumer dropped; stopping completion loop");
                        return;
                    }
                }
                if let Some(calls) = delta["tool_calls"].as_array() {
                    for call in calls {
                        accumulate_tool_call(&mut pending_calls, call);
                    }
                }
            }
        }

        if finish_reason.as_deref() == Some("tool_calls") && !pending_calls.is_empty() {
            debug!(
                "Model requested {} tool call(s): {:?}",
                pending_calls.len(),
                pending_calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
            );
            messages.push(assistant_tool_call_message(&pending_calls));
            for call in &pending_calls {
                let args: Value =
                    serde_json::from_str(&call.arguments).unwrap_or_else(|_| json!({}));
                let result = ctx.tools.dispatch(&call.name, args, &ctx.invocation).await;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": result,
                }));
            }
            continue;
        }

        // Dropping tx ends the consumer's stream.
        return;
    }
    warn!("Tool round limit reached without a final answer");
}

/// Merge one streamed `tool_calls` delta into the pending set, keyed by the
/// call index. Argument fragments are concatenated across deltas.
fn accumulate_tool_call(pending: &mut Vec<PendingToolCall>, delta: &Value) {
    let index = delta["index"].as_u64().unwrap_or(0);
    let slot = match pending.iter().position(|c| c.index == index) {
        Some(slot) => slot,
        None => {
            pending.push(PendingToolCall {
                index,
                ..Default::default()
            });
            pending.len() - 1
        }
    };
    let entry = &mut pending[slot];
    if let Some(id) = delta["id"].as_str() {
        entry.id = id.to_string();
    }
    if let Some(name) = delta["function"]["name"].as_str() {
        entry.name = name.to_string();
    }
    if let Some(fragment) = delta["function"]["arguments"].as_str() {
        entry.arguments.push_str(fragment);
    }
}

fn assistant_tool_call_message(calls: &[PendingToolCall]) -> Value {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "type": "function",
                "function": { "name": c.name, "arguments": c.arguments },
            })
        })
        .collect();
    json!({ "role": "assistant", "content": Value::Null, "tool_calls": tool_calls })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulate_tool_call_merges_fragments() {
        let mut pending = Vec::new();
        accumulate_tool_call(
            &mut pending,
            &json!({ "index": 0, "id": "call_1", "function": { "name": "email_bank_statement", "arguments": "{\"em" } }),
        );
        accumulate_tool_call(
            &mut pending,
            &json!({ "index": 0, "function": { "arguments": "ail\": \"a@b.c\"}" } }),
        );

        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "call_1");
        assert_eq!(pending[0].name, "email_bank_statement");
        let args: Value = serde_json::from_str(&pending[0].arguments).unwrap();
        assert_eq!(args["email"], "a@b.c");
    }

    #[test]
    fn test_accumulate_tool_call_separates_indices() {
        let mut pending = Vec::new();
        accumulate_tool_call(
            &mut pending,
            &json!({ "index": 0, "id": "a", "function": { "name": "first", "arguments": "{}" } }),
        );
        accumulate_tool_call(
            &mut pending,
            &json!({ "index": 1, "id": "b", "function": { "name": "second", "arguments": "{}" } }),
        );
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1].name, "second");
    }

    #[test]
    fn test_assistant_tool_call_message_shape() {
        let calls = vec![PendingToolCall {
            index: 0,
            id: "call_1".into(),
            name: "check_account_balance".into(),
            arguments: "{}".into(),
        }];
        let message = assistant_tool_call_message(&calls);
        assert_eq!(message["role"], "assistant");
        assert_eq!(message["tool_calls"][0]["function"]["name"], "check_account_balance");
    }

    #[test]
    fn test_build_messages_maps_roles() {
        let registry = Arc::new(ToolRegistry::new());
        let llm = GroqLlm::new(
            "key".into(),
            "llama-3.3-70b-versatile".into(),
            0.7,
            None,
            ToolSet::default(),
            registry,
        )
        .unwrap();

        let history = vec![ChatTurn::user("hi"), ChatTurn::agent("hello")];
        let messages = llm.build_messages(&history);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
    }

    #[test]
    fn test_new_rejects_empty_key() {
        let registry = Arc::new(ToolRegistry::new());
        let result = GroqLlm::new(
            String::new(),
            "llama-3.3-70b-versatile".into(),
            0.7,
            None,
            ToolSet::default(),
            registry,
        );
        assert!(matches!(result, Err(LlmError::ConfigurationError(_))));
    }
}
