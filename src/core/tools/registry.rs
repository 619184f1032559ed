//! Registry for tracking in-flight tool executions.
//!
//! Owned by one session's orchestrator, never shared across sessions. Tool
//! bodies register a cancel hook before any observable side effect, execute
//! cooperatively, and unregister in a guaranteed-release scope (see
//! [`ToolGuard`]). The interruption handler and session teardown use
//! `cancel_all` to request that every active tool stop at its next
//! checkpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Non-blocking cancellation hook supplied at registration. Must only flip
/// a flag the tool body polls; it runs under the registry lock.
pub type CancelHook = Box<dyn Fn() + Send + Sync>;

/// Snapshot of one active execution, for debugging and assertions.
#[derive(Debug, Clone)]
pub struct ToolExecution {
    pub tool_id: String,
    pub tool_name: String,
    pub metadata: serde_json::Value,
    pub started_at: Instant,
    pub cancelled: bool,
}

struct ToolEntry {
    tool_id: String,
    tool_name: String,
    hook: CancelHook,
    metadata: serde_json::Value,
    started_at: Instant,
    cancelled: bool,
}

/// Per-session registry of active tool executions.
///
/// Insertion order is preserved so `active()` reads as an execution
/// timeline. `cancel_all` is atomic with respect to registration: a
/// registration is either visible and gets its hook invoked, or it lands
/// while the registry is draining and is cancelled immediately on insert.
pub struct ToolRegistry {
    entries: Mutex<Vec<ToolEntry>>,
    draining: AtomicBool,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            draining: AtomicBool::new(false),
        }
    }

    /// Register an execution and return its opaque id.
    pub fn register(
        &self,
        tool_name: &str,
        cancel_hook: CancelHook,
        metadata: serde_json::Value,
    ) -> String {
        let tool_id = Uuid::new_v4().to_string();
        let mut entry = ToolEntry {
            tool_id: tool_id.clone(),
            tool_name: tool_name.to_string(),
            hook: cancel_hook,
            metadata,
            started_at: Instant::now(),
            cancelled: false,
        };

        let mut entries = self.entries.lock();
        if self.draining.load(Ordering::SeqCst) {
            // Session is tearing down: the tool observes cancellation on
            // its first poll.
            (entry.hook)();
            entry.cancelled = true;
        }
        debug!(
            "Registered tool '{}' (id {})",
            entry.tool_name,
            &tool_id[..8]
        );
        entries.push(entry);
        tool_id
    }

    /// Remove an execution. Returns false if the id was not registered.
    pub fn unregister(&self, tool_id: &str) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| {
            if e.tool_id == tool_id {
                debug!(
                    "Unregistered tool '{}' (id {}, ran {:?})",
                    e.tool_name,
                    &e.tool_id[..8],
                    e.started_at.elapsed()
                );
                false
            } else {
                true
            }
        });
        before != entries.len()
    }

    /// Cancel one execution. The entry stays registered until the tool body
    /// observes its flag and unregisters.
    pub fn cancel(&self, tool_id: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|e| e.tool_id == tool_id) {
            Some(entry) => {
                if !entry.cancelled {
                    (entry.hook)();
                    entry.cancelled = true;
                    info!("Cancelled tool '{}' (id {})", entry.tool_name, &tool_id[..8]);
                }
                true
            }
            None => {
                warn!("Cancel requested for unknown tool id {tool_id}");
                false
            }
        }
    }

    /// Cancel every active execution. Returns how many hooks were invoked.
    pub fn cancel_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let mut cancelled = 0;
        for entry in entries.iter_mut() {
            if !entry.cancelled {
                (entry.hook)();
                entry.cancelled = true;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            info!("Cancelled {cancelled} active tool(s)");
        }
        cancelled
    }

    /// Put the registry into draining mode and cancel everything. Used at
    /// session teardown; registrations arriving afterwards are cancelled on
    /// insert.
    pub fn drain(&self) -> usize {
        self.draining.store(true, Ordering::SeqCst);
        self.cancel_all()
    }

    /// Snapshot of all active executions, in registration order.
    pub fn active(&self) -> Vec<ToolExecution> {
        self.entries
            .lock()
            .iter()
            .map(|e| ToolExecution {
                tool_id: e.tool_id.clone(),
                tool_name: e.tool_name.clone(),
                metadata: e.metadata.clone(),
                started_at: e.started_at,
                cancelled: e.cancelled,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII registration handle: dropping it releases the registry entry, so a
/// tool body cannot leak its registration on early return or panic.
pub struct ToolGuard {
    registry: Arc<ToolRegistry>,
    tool_id: String,
}

impl ToolGuard {
    pub fn new(registry: Arc<ToolRegistry>, tool_id: String) -> Self {
        Self { registry, tool_id }
    }

    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }
}

impl Drop for ToolGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.tool_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flag_hook(flag: &Arc<AtomicBool>) -> CancelHook {
        let flag = flag.clone();
        Box::new(move || flag.store(true, Ordering::SeqCst))
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = ToolRegistry::new();
        let flag = Arc::new(AtomicBool::new(false));
        let id = registry.register("lookup", flag_hook(&flag), json!({}));

        assert_eq!(registry.active().len(), 1);
        assert!(registry.unregister(&id));
        assert!(registry.is_empty());
        assert!(!registry.unregister(&id));
    }

    #[test]
    fn test_cancel_invokes_hook_once() {
        let registry = ToolRegistry::new();
        let flag = Arc::new(AtomicBool::new(false));
        let id = registry.register("lookup", flag_hook(&flag), json!({}));

        assert!(registry.cancel(&id));
        assert!(flag.load(Ordering::SeqCst));
        // Entry remains until the body releases it.
        assert_eq!(registry.active().len(), 1);
        assert!(registry.active()[0].cancelled);

        // Second cancel is a no-op but still reports the entry as known.
        assert!(registry.cancel(&id));
    }

    #[test]
    fn test_cancel_all_flags_every_entry() {
        let registry = ToolRegistry::new();
        let flags: Vec<_> = (0..3).map(|_| Arc::new(AtomicBool::new(false))).collect();
        for (i, flag) in flags.iter().enumerate() {
            registry.register(&format!("tool_{i}"), flag_hook(flag), json!({}));
        }

        assert_eq!(registry.cancel_all(), 3);
        assert!(flags.iter().all(|f| f.load(Ordering::SeqCst)));
        // Repeat cancels nothing new.
        assert_eq!(registry.cancel_all(), 0);
    }

    #[test]
    fn test_registration_during_drain_is_cancelled_on_insert() {
        let registry = ToolRegistry::new();
        registry.drain();

        let flag = Arc::new(AtomicBool::new(false));
        registry.register("late_tool", flag_hook(&flag), json!({}));
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_active_preserves_insertion_order() {
        let registry = ToolRegistry::new();
        for name in ["first", "second", "third"] {
            let flag = Arc::new(AtomicBool::new(false));
            registry.register(name, flag_hook(&flag), json!({}));
        }
        let names: Vec<_> = registry.active().into_iter().map(|e| e.tool_name).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let registry = Arc::new(ToolRegistry::new());
        let flag = Arc::new(AtomicBool::new(false));
        let id = registry.register("guarded", flag_hook(&flag), json!({}));
        {
            let _guard = ToolGuard::new(registry.clone(), id);
            assert_eq!(registry.active().len(), 1);
        }
        assert!(registry.is_empty());
    }
}
