//! Built-in mock banking tools.
//!
//! Both tools demonstrate the cooperative cancellation contract: they
//! register with the session registry before doing anything observable,
//! poll their cancel flag between steps, and release their registration
//! through a [`ToolGuard`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info};

use super::{AgentTool, ToolError, ToolGuard, ToolInvocation};

fn cancel_flag() -> (Arc<AtomicBool>, super::CancelHook) {
    let flag = Arc::new(AtomicBool::new(false));
    let hook_flag = flag.clone();
    let hook = Box::new(move || hook_flag.store(true, Ordering::SeqCst));
    (flag, hook)
}

/// Foreground balance lookup. Runs in the tool-call path of the agent run,
/// checking for cancellation between simulated work steps.
pub struct CheckAccountBalance;

#[async_trait::async_trait]
impl AgentTool for CheckAccountBalance {
    fn name(&self) -> &'static str {
        "check_account_balance"
    }

    fn description(&self) -> &'static str {
        "Look up the user's current account balance."
    }

    async fn call(
        &self,
        _args: serde_json::Value,
        ctx: &ToolInvocation,
    ) -> Result<String, ToolError> {
        let (cancelled, hook) = cancel_flag();
        let tool_id = ctx.registry.register(
            self.name(),
            hook,
            json!({ "category": "banking", "type": "balance_lookup" }),
        );
        let guard = ToolGuard::new(ctx.registry.clone(), tool_id);
        debug!("Balance lookup started (id {})", &guard.tool_id()[..8]);

        for step in 0..5 {
            if cancelled.load(Ordering::SeqCst) {
                info!("Balance lookup cancelled at step {step}");
                return Ok("Account balance request cancelled.".to_string());
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        // Final check before emitting the result.
        if cancelled.load(Ordering::SeqCst) {
            return Ok("Account balance request cancelled.".to_string());
        }
        Ok("Your current account balance is $4,821.17.".to_string())
    }
}

/// Background statement delivery. Registers, spawns the delivery task,
/// acknowledges once the task is running, and lets the task release the
/// registration when it completes or observes cancellation.
pub struct EmailBankStatement;

#[async_trait::async_trait]
impl AgentTool for EmailBankStatement {
    fn name(&self) -> &'static str {
        "email_bank_statement"
    }

    fn description(&self) -> &'static str {
        "Email the user's latest bank statement to the given address."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "email": {
                    "type": "string",
                    "description": "Destination email address"
                }
            },
            "required": ["email"]
        })
    }

    async fn call(
        &self,
        args: serde_json::Value,
        ctx: &ToolInvocation,
    ) -> Result<String, ToolError> {
        let email = args
            .get("email")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("missing 'email'".to_string()))?
            .to_string();

        let (cancelled, hook) = cancel_flag();
        let tool_id = ctx.registry.register(
            self.name(),
            hook,
            json!({ "category": "banking", "type": "statement_email", "email": email }),
        );
        let guard = ToolGuard::new(ctx.registry.clone(), tool_id);

        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let task_email = email.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let _ = ready_tx.send(());
            for _ in 0..20 {
                if cancelled.load(Ordering::SeqCst) {
                    info!("Statement email to {task_email} cancelled before delivery");
                    return;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            info!("Statement emailed to {task_email}");
        });

        // Don't claim the delivery is underway until the task is live.
        let _ = ready_rx.await;
        Ok(format!(
            "I'm emailing your bank statement to {email} now; it should arrive within a few minutes."
        ))
    }
}
