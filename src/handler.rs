//! # Handler Registry
//!
//! Maps the handler reference persisted with a task back to a live,
//! executable capability.
//!
//! Handlers are registered once at process start under a stable string name;
//! the expiry listener resolves that name at dispatch time. There is no
//! runtime code loading: the registry is a compile-time-populated table
//! shared across dispatches via `Arc`.

use crate::errors::{TaskError, TaskResult};
use crate::record::TaskRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// The work behind a task.
///
/// `execute` receives the fully reconstructed record (id, payload, ttl,
/// handler reference) and may suspend freely; the dispatching listener awaits
/// completion before releasing the task's lock.
///
/// ```
/// use ttl_tasks::{TaskHandler, TaskRecord, TaskResult};
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl TaskHandler for Echo {
///     async fn execute(&self, task: TaskRecord) -> TaskResult<serde_json::Value> {
///         Ok(task.payload)
///     }
/// }
///
/// let task = TaskRecord::new("jobs/echo", "t1")
///     .with_payload(serde_json::json!({"session": "s-17"}));
/// let result = tokio_test::block_on(Echo.execute(task)).unwrap();
/// assert_eq!(result, serde_json::json!({"session": "s-17"}));
/// ```
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(&self, task: TaskRecord) -> TaskResult<serde_json::Value>;
}

/// Registry of named handlers, populated before listening starts.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a stable name.
    ///
    /// Duplicate names are rejected rather than silently replaced: a second
    /// registration for a name almost always means two components disagree
    /// about who owns it.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl TaskHandler + 'static,
    ) -> TaskResult<()> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(TaskError::HandlerResolution(format!(
                "handler '{name}' is already registered"
            )));
        }
        self.handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Resolve a stored handler reference to its executable capability.
    pub fn resolve(&self, name: &str) -> TaskResult<Arc<dyn TaskHandler>> {
        self.handlers.get(name).cloned().ok_or_else(|| {
            TaskError::HandlerResolution(format!("no handler registered for '{name}'"))
        })
    }

    pub fn registered_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}
