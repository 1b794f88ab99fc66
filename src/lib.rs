//! # ttl-tasks
//!
//! Deferred, at-most-once task execution driven by Redis key-expiry
//! notifications.
//!
//! ## Overview
//!
//! A task is persisted once with a TTL on a dedicated expiry marker. When the
//! marker lapses, Redis announces it on a keyspace channel; one of possibly
//! many listening processes loads, locks, and executes the task exactly once,
//! even though every listener receives the same notification. All
//! coordination lives in Redis primitives: `SETNX` for mutual exclusion,
//! `EXPIRE` for scheduling, pub/sub for delivery. Nothing is locked
//! in-process.
//!
//! ## Module Organization
//!
//! - [`record`] - task records, TTL constants, and the persisted wire format
//! - [`keys`] - key namespace derivation and notification-channel decoding
//! - [`store`] - pipelined Redis persistence and the atomic load+lock
//! - [`handler`] - the [`TaskHandler`] trait and the process-wide registry
//! - [`listener`] - expiry-notification subscription and dispatch
//! - [`config`] - store connection configuration
//! - [`errors`] - the [`TaskError`] taxonomy
//! - [`logging`] - console tracing setup for embedding processes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ttl_tasks::{
//!     ExpiryListener, HandlerRegistry, RedisTaskStore, StoreConfig, TaskHandler, TaskRecord,
//!     TaskResult,
//! };
//!
//! struct Cleanup;
//!
//! #[async_trait::async_trait]
//! impl TaskHandler for Cleanup {
//!     async fn execute(&self, task: TaskRecord) -> TaskResult<serde_json::Value> {
//!         println!("cleaning up session {}", task.id);
//!         Ok(serde_json::Value::Null)
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::from_env()?;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register("jobs/cleanup", Cleanup)?;
//!
//! // Schedule: run jobs/cleanup for session s-17 in an hour
//! let store = RedisTaskStore::connect(&config).await?;
//! let task = TaskRecord::new("jobs/cleanup", "s-17").with_ttl(ttl_tasks::ttl::HOUR);
//! store.save(&task).await?;
//!
//! // Listen: any number of processes may run this against the same Redis
//! let listener = ExpiryListener::connect(&config, Arc::new(registry)).await?;
//! let handle = listener.start().await?;
//! # handle.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees and Limitations
//!
//! At-most-once execution across a fleet comes from the atomic load: one
//! `MULTI`/`EXEC` batch pairs `SETNX` on the lock key with `GET` on the value
//! key, so exactly one contender wins each unlocked window. Lock keys carry
//! no TTL: a handler failure or an executor crash between lock and unlock
//! leaves the task locked until cleared manually (`RedisTaskStore::clear` or
//! `unlock`). Redis must have keyspace notifications for expired events
//! enabled (`notify-keyspace-events` including `Kx`).

pub mod config;
pub mod errors;
pub mod handler;
pub mod keys;
pub mod listener;
pub mod logging;
pub mod record;
pub mod store;

pub use config::StoreConfig;
pub use errors::{TaskError, TaskResult};
pub use handler::{HandlerRegistry, TaskHandler};
pub use listener::{ExpiryListener, ListenerHandle, ListenerStats};
pub use record::{ttl, TaskRecord};
pub use store::{LockState, RedisTaskStore};
