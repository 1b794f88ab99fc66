//! # Key Namespace
//!
//! Deterministic derivation of the three Redis keys backing one task, and the
//! symmetric decoding of keyspace-notification channel names back into a
//! `(handler, id)` pair.
//!
//! Every task owns three keys under a fixed prefix:
//!
//! ```text
//! resources:{handler}:{id}:value    <- serialized record, no TTL
//! resources:{handler}:{id}:lock     <- mutual-exclusion flag, no TTL
//! resources:{handler}:{id}:expire   <- sentinel whose TTL schedules the task
//! ```
//!
//! Redis announces the marker's expiry on the keyspace channel
//! `__keyspace@{db}__:resources:{handler}:{id}:expire` with payload
//! `"expired"`. [`parse_expiry_channel`] is the inverse of [`task_key`] for
//! that channel shape: the id is the last `:`-separated segment before the
//! suffix, so handler names may themselves contain `:` (ids may not).

use crate::errors::{TaskError, TaskResult};

/// Fixed prefix for every key owned by this system
pub const KEY_PREFIX: &str = "resources:";

/// Notification payload that triggers a dispatch; all other event kinds
/// ("del", eviction, ...) are ignored
pub const EXPIRED_EVENT: &str = "expired";

/// Which of a task's three keys is being addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Serialized record content
    Value,
    /// Mutual-exclusion flag
    Lock,
    /// TTL-carrying expiry marker
    Expire,
}

impl KeyKind {
    fn suffix(self) -> &'static str {
        match self {
            KeyKind::Value => "value",
            KeyKind::Lock => "lock",
            KeyKind::Expire => "expire",
        }
    }
}

/// Derive the store key for one of a task's three slots.
pub fn task_key(handler: &str, id: &str, kind: KeyKind) -> String {
    format!("{KEY_PREFIX}{handler}:{id}:{}", kind.suffix())
}

/// Check an id against the key contract: non-empty and free of `:`.
///
/// [`parse_expiry_channel`] treats the trailing `:`-separated segment as the
/// id, so an id containing `:` would store under keys that decode to the
/// wrong `(handler, id)` pair, and an empty id is undispatchable.
pub fn validate_id(id: &str) -> TaskResult<()> {
    if id.is_empty() || id.contains(':') {
        return Err(TaskError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Psubscribe pattern matching expiry-marker notifications for every task in
/// the namespace, on any database.
pub fn notification_pattern() -> String {
    format!("__keyspace@*__:{KEY_PREFIX}*:expire")
}

/// Decode a keyspace-notification channel name into `(handler, id)`.
///
/// Returns `None` for any channel that is not an expiry-marker key in this
/// system's namespace.
pub fn parse_expiry_channel(channel: &str) -> Option<(String, String)> {
    let key = channel.strip_prefix("__keyspace@")?;
    let (_db, key) = key.split_once("__:")?;
    let rest = key.strip_prefix(KEY_PREFIX)?;
    let rest = rest.strip_suffix(":expire")?;
    // id is the trailing segment and never contains ':'
    let (handler, id) = rest.rsplit_once(':')?;
    if handler.is_empty() || id.is_empty() {
        return None;
    }
    Some((handler.to_string(), id.to_string()))
}
