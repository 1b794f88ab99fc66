//! # Task Record
//!
//! In-memory representation of a deferred task and its persisted wire format.
//!
//! A record carries identity (`handler` + `id`), an opaque JSON payload, and
//! the TTL that schedules its execution. Lock state is deliberately not part
//! of the record; it is derived from the presence of the lock key in the
//! store (see [`crate::store::LockState`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// TTL unit constants, in seconds
pub mod ttl {
    pub const SECOND: u64 = 1;
    pub const MINUTE: u64 = 60;
    pub const HOUR: u64 = 3_600;
    pub const DAY: u64 = 86_400;
    pub const WEEK: u64 = 604_800;
    pub const MONTH: u64 = 2_592_000;
    pub const YEAR: u64 = 31_536_000;
}

/// A unit of deferred work, keyed by `(handler, id)`.
///
/// `handler` doubles as the registry name the expiry listener resolves at
/// dispatch time, so it must match a name registered in the
/// [`HandlerRegistry`](crate::handler::HandlerRegistry) of every listening
/// process.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    /// Unique within the handler's namespace; must be non-empty and contain
    /// no `:` (enforced by the store at save time)
    pub id: String,
    /// Registry name of the handler that executes this task
    pub handler: String,
    /// Opaque data passed to the handler at execution time
    pub payload: Value,
    /// Lifetime of the expiry marker; execution triggers when it lapses
    pub ttl_seconds: u64,
}

impl TaskRecord {
    /// Create a record with a null payload and the default one-month TTL.
    pub fn new(handler: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handler: handler.into(),
            payload: Value::Null,
            ttl_seconds: ttl::MONTH,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }
}

/// Value-key content, exactly as persisted: `{data, ttl, module}`.
///
/// The shape is part of the on-store contract and must round-trip unchanged
/// through the store adapter's write/read path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    pub data: Value,
    pub ttl: u64,
    pub module: String,
}

impl StoredRecord {
    pub fn from_record(record: &TaskRecord) -> Self {
        Self {
            data: record.payload.clone(),
            ttl: record.ttl_seconds,
            module: record.handler.clone(),
        }
    }

    /// Rebuild a full record from stored content plus the identity the keys
    /// were derived from.
    pub fn into_record(self, handler: impl Into<String>, id: impl Into<String>) -> TaskRecord {
        TaskRecord {
            id: id.into(),
            handler: handler.into(),
            payload: self.data,
            ttl_seconds: self.ttl,
        }
    }
}
