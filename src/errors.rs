//! Error types for the ttl-tasks system.

use thiserror::Error;

/// Errors surfaced by the task store, handler registry, and expiry listener.
///
/// `TaskLocked` and `MissingValue` are expected outcomes under multi-listener
/// deployment (another process won the dispatch race, or the task was already
/// consumed) and are treated as normal "nothing to do" signals by the expiry
/// listener. Everything else is a real fault. No operation retries
/// automatically; callers own their retry policy.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Transport or server-side failure from Redis, passed through verbatim
    #[error("Store error: {0}")]
    Store(String),

    /// The task's lock key was already present at load/lock time
    #[error("Task {handler}:{id} is locked")]
    TaskLocked { handler: String, id: String },

    /// No value key content for the task at load time
    #[error("No stored value for task {handler}:{id}")]
    MissingValue { handler: String, id: String },

    /// A record was saved without a handler reference
    #[error("Task has no handler reference")]
    MissingHandler,

    /// Task id violates the key contract (empty, or contains ':')
    #[error("Invalid task id '{0}': must be non-empty and contain no ':'")]
    InvalidId(String),

    /// Handler reference does not resolve to a registered handler
    #[error("Handler resolution failed: {0}")]
    HandlerResolution(String),

    /// Record could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Required store connection was missing or unusable at construction
    #[error("Client not configured: {0}")]
    Unconfigured(String),

    /// Handler execution reported a failure
    #[error("Handler execution failed: {0}")]
    Execution(String),
}

impl From<redis::RedisError> for TaskError {
    fn from(error: redis::RedisError) -> Self {
        TaskError::Store(error.to_string())
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(error: serde_json::Error) -> Self {
        TaskError::Serialization(error.to_string())
    }
}

/// Result type for all task operations
pub type TaskResult<T> = Result<T, TaskError>;
