//! Agent tool execution: the per-session registry, the tool trait, and the
//! built-in tool set.

pub mod builtin;
pub mod registry;

use std::sync::Arc;

pub use registry::{CancelHook, ToolExecution, ToolGuard, ToolRegistry};

/// Error types for tool execution
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// Context handed to a tool body for one invocation.
///
/// Tools hold only the session's registry handle, never the agent runner;
/// cancellation flows exclusively through registered hooks.
#[derive(Clone)]
pub struct ToolInvocation {
    pub registry: Arc<ToolRegistry>,
}

/// A callable tool exposed to the language model.
#[async_trait::async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the tool's arguments, OpenAI function-call style.
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    /// Execute the tool. Implementations register with
    /// `ctx.registry` before any observable side effect and poll their
    /// cancel flag at every checkpoint.
    async fn call(
        &self,
        args: serde_json::Value,
        ctx: &ToolInvocation,
    ) -> Result<String, ToolError>;
}

/// The set of tools offered to the model for one session.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn AgentTool>>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn AgentTool>>) -> Self {
        Self { tools }
    }

    /// The default tool set shipped with the server.
    pub fn builtin() -> Self {
        Self::new(vec![
            Arc::new(builtin::CheckAccountBalance),
            Arc::new(builtin::EmailBankStatement),
        ])
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Tool definitions in the wire format chat-completions APIs expect.
    pub fn definitions(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.parameters(),
                    }
                })
            })
            .collect()
    }

    /// Dispatch a tool call by name. Unknown names and execution failures
    /// are folded into an error string so the model can recover in-band.
    pub async fn dispatch(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &ToolInvocation,
    ) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            tracing::warn!("Model requested unknown tool '{name}'");
            return format!("Error: tool '{name}' is not available.");
        };

        match tool.call(args, ctx).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Tool '{name}' failed: {e}");
                format!("Error: {e}")
            }
        }
    }
}
