//! # Expiry Listener
//!
//! Subscribes to Redis keyspace notifications for this system's expiry
//! markers and drives the dispatch sequence: load + lock, execute, unlock.
//!
//! ## Dispatch pipeline
//!
//! ```text
//! pmessage (pattern, channel, "expired")
//!     -> match_notification          (decode channel, filter event kind)
//!     -> RedisTaskStore::atomic_load (SETNX lock + GET value, one batch)
//!     -> HandlerRegistry::resolve    (stored handler ref -> capability)
//!     -> TaskHandler::execute        (awaited to completion)
//!     -> RedisTaskStore::unlock      (only after a successful execution)
//! ```
//!
//! The subscription connection is reserved for receiving notifications;
//! every store command in a dispatch chain runs on a clone of the store's
//! multiplexed command connection. Each matched notification spawns an
//! independent dispatch chain, so distinct tasks proceed fully concurrently
//! while dispatches for the *same* task are serialized by `SETNX` on the
//! store, not by anything in-process. Any number of listener processes can
//! share one Redis: all of them receive the same notification, exactly one
//! wins `atomic_load`, and the rest observe `TaskLocked` and stand down.
//!
//! ## Failure discipline
//!
//! Contention (`TaskLocked`) and already-consumed (`MissingValue`) outcomes
//! are expected under multi-listener deployment and are logged at debug.
//! Every other dispatch error is logged and swallowed; the receive loop never
//! stops subscribing. If the subscription connection itself drops (the redis
//! crate's pub/sub connection does not reconnect on its own), the loop
//! rebuilds it and resubscribes with a capped backoff, counting the event in
//! [`ListenerStats::reconnects`]. A handler that returns `Err` leaves its task locked
//! (the lock key has no TTL), so such tasks stay stuck until cleared
//! manually. That mirrors the persisted-lock semantics described in
//! [`crate::store`].

use crate::config::StoreConfig;
use crate::errors::{TaskError, TaskResult};
use crate::handler::HandlerRegistry;
use crate::keys::{self, EXPIRED_EVENT};
use crate::store::RedisTaskStore;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Counters describing one listener's activity since `start`.
#[derive(Debug, Clone, Default)]
pub struct ListenerStats {
    /// Notifications that matched the namespace with an "expired" event
    pub notifications: u64,
    /// Dispatches that executed a handler and released the lock
    pub executions: u64,
    /// Dispatches that lost the load+lock race (or found nothing stored)
    pub races_lost: u64,
    /// Dispatches that failed: store error, unresolvable handler, handler
    /// error, or a failed unlock
    pub failures: u64,
    /// Times the subscription connection was rebuilt after the message
    /// stream ended
    pub reconnects: u64,
}

enum DispatchOutcome {
    Executed,
    LostRace,
    Failed,
}

/// Expiry-notification subscriber with an explicit lifecycle.
///
/// Holds a dedicated pub/sub connection once started; `stop` on the returned
/// [`ListenerHandle`] shuts the receive loop down.
pub struct ExpiryListener {
    client: redis::Client,
    store: RedisTaskStore,
    registry: Arc<HandlerRegistry>,
}

impl ExpiryListener {
    pub fn new(client: redis::Client, store: RedisTaskStore, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            client,
            store,
            registry,
        }
    }

    /// Build a listener and its command connection from configuration.
    pub async fn connect(config: &StoreConfig, registry: Arc<HandlerRegistry>) -> TaskResult<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| TaskError::Unconfigured(format!("invalid store URL: {e}")))?;
        let store = RedisTaskStore::connect(config).await?;
        Ok(Self::new(client, store, registry))
    }

    /// Subscribe and spawn the receive loop.
    pub async fn start(self) -> TaskResult<ListenerHandle> {
        let pattern = keys::notification_pattern();
        let pubsub = subscribe(&self.client, &pattern).await?;

        info!(
            pattern = %pattern,
            handlers = ?self.registry.registered_names(),
            "expiry listener subscribed"
        );

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let stats = Arc::new(Mutex::new(ListenerStats::default()));

        let loop_stats = Arc::clone(&stats);
        let client = self.client;
        let store = self.store;
        let registry = self.registry;

        let join = tokio::spawn(async move {
            receive_loop(
                client,
                pattern,
                pubsub,
                store,
                registry,
                loop_stats,
                &mut shutdown_rx,
            )
            .await;
        });

        Ok(ListenerHandle {
            shutdown: shutdown_tx,
            join,
            stats,
        })
    }
}

/// Open a fresh pub/sub connection and psubscribe it.
async fn subscribe(client: &redis::Client, pattern: &str) -> TaskResult<redis::aio::PubSub> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(pattern).await?;
    Ok(pubsub)
}

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Consume notifications until shutdown.
///
/// The subscription connection has no automatic reconnection (unlike the
/// command side's `ConnectionManager`), so when the message stream ends the
/// loop rebuilds the connection and resubscribes with a capped exponential
/// backoff instead of going deaf.
async fn receive_loop(
    client: redis::Client,
    pattern: String,
    mut pubsub: redis::aio::PubSub,
    store: RedisTaskStore,
    registry: Arc<HandlerRegistry>,
    stats: Arc<Mutex<ListenerStats>>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        let mut messages = Box::pin(pubsub.into_on_message());
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!("expiry listener stopping");
                        return;
                    }
                }
                message = messages.next() => {
                    let Some(message) = message else {
                        warn!("subscription stream closed, resubscribing");
                        break;
                    };

                    let channel = message.get_channel_name().to_string();
                    let event: String = match message.get_payload() {
                        Ok(event) => event,
                        Err(e) => {
                            warn!(channel = %channel, error = %e, "undecodable notification payload");
                            continue;
                        }
                    };

                    let Some((handler, id)) = match_notification(&channel, &event) else {
                        debug!(channel = %channel, event = %event, "ignoring notification");
                        continue;
                    };
                    stats.lock().unwrap().notifications += 1;

                    let store = store.clone();
                    let registry = Arc::clone(&registry);
                    let stats = Arc::clone(&stats);
                    tokio::spawn(async move {
                        let outcome = dispatch(&store, &registry, &handler, &id).await;
                        let mut stats = stats.lock().unwrap();
                        match outcome {
                            DispatchOutcome::Executed => stats.executions += 1,
                            DispatchOutcome::LostRace => stats.races_lost += 1,
                            DispatchOutcome::Failed => stats.failures += 1,
                        }
                    });
                }
            }
        }
        drop(messages);

        let mut backoff = INITIAL_BACKOFF;
        pubsub = loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!("expiry listener stopping");
                        return;
                    }
                }
                _ = tokio::time::sleep(backoff) => {}
            }
            match subscribe(&client, &pattern).await {
                Ok(pubsub) => {
                    info!(pattern = %pattern, "expiry listener resubscribed");
                    stats.lock().unwrap().reconnects += 1;
                    break pubsub;
                }
                Err(e) => {
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    warn!(error = %e, next_attempt = ?backoff, "resubscribe failed");
                }
            }
        };
    }
}

/// Running listener. Dropping the handle also stops the receive loop.
pub struct ListenerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
    stats: Arc<Mutex<ListenerStats>>,
}

impl ListenerHandle {
    /// Signal shutdown and wait for the receive loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            if e.is_panic() {
                error!("expiry listener task panicked");
            }
        }
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats.lock().unwrap().clone()
    }

    /// Whether the receive loop is still alive. It only exits on `stop`
    /// (or a panic); losing the subscription connection does not end it.
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }
}

/// Decide whether a `(channel, event)` pair is an expiry of one of our
/// markers. Only the "expired" event kind is acted upon; "del", eviction and
/// friends are ignored even on a matching channel.
fn match_notification(channel: &str, event: &str) -> Option<(String, String)> {
    if event != EXPIRED_EVENT {
        return None;
    }
    keys::parse_expiry_channel(channel)
}

/// One dispatch chain: load + lock, resolve, execute, unlock.
async fn dispatch(
    store: &RedisTaskStore,
    registry: &HandlerRegistry,
    handler: &str,
    id: &str,
) -> DispatchOutcome {
    let record = match store.atomic_load(handler, id).await {
        Ok(record) => record,
        Err(TaskError::TaskLocked { .. }) => {
            debug!(handler, id, "lost dispatch race");
            return DispatchOutcome::LostRace;
        }
        Err(TaskError::MissingValue { .. }) => {
            debug!(handler, id, "no stored value, nothing to dispatch");
            return DispatchOutcome::LostRace;
        }
        Err(e) => {
            error!(handler, id, error = %e, "atomic load failed");
            return DispatchOutcome::Failed;
        }
    };

    let capability = match registry.resolve(&record.handler) {
        Ok(capability) => capability,
        Err(e) => {
            // Lock state is left untouched
            error!(handler, id, error = %e, "handler resolution failed");
            return DispatchOutcome::Failed;
        }
    };

    match capability.execute(record).await {
        Ok(_) => {
            if let Err(e) = store.unlock(handler, id).await {
                error!(handler, id, error = %e, "unlock failed after execution");
                return DispatchOutcome::Failed;
            }
            debug!(handler, id, "task executed and unlocked");
            DispatchOutcome::Executed
        }
        Err(e) => {
            // The lock stays: no TTL on lock keys, so the task is stuck
            // until cleared manually
            error!(handler, id, error = %e, "handler execution failed; task remains locked");
            DispatchOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_event_on_marker_channel_matches() {
        let channel = "__keyspace@0__:resources:jobs/cleanup:t1:expire";
        assert_eq!(
            match_notification(channel, "expired"),
            Some(("jobs/cleanup".to_string(), "t1".to_string()))
        );
    }

    #[test]
    fn test_del_event_on_matching_channel_is_ignored() {
        let channel = "__keyspace@0__:resources:jobs/cleanup:t1:expire";
        assert_eq!(match_notification(channel, "del"), None);
    }

    #[test]
    fn test_expired_event_on_foreign_channel_is_ignored() {
        assert_eq!(match_notification("__keyspace@0__:sessions:abc", "expired"), None);
        assert_eq!(
            match_notification("__keyspace@0__:resources:jobs:t1:value", "expired"),
            None
        );
    }
}
