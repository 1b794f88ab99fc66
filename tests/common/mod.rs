//! Shared helpers for integration tests that need a running Redis.
//!
//! Tests use uuid-unique handler names so suites can run concurrently
//! against a shared server without colliding in the key namespace.

use std::time::Duration;
use tracing::warn;
use ttl_tasks::{RedisTaskStore, StoreConfig};
use uuid::Uuid;

pub fn test_config() -> StoreConfig {
    StoreConfig::new(
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
    )
}

/// Connect to the test Redis, or `None` to skip the test when the server is
/// unavailable.
pub async fn test_store() -> Option<RedisTaskStore> {
    ttl_tasks::logging::init_tracing();
    match RedisTaskStore::connect(&test_config()).await {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Skipping Redis test (not available): {e}");
            None
        }
    }
}

/// Unique handler name per test run
pub fn unique_handler(base: &str) -> String {
    format!("{base}/{}", Uuid::new_v4())
}

/// Enable keyspace notifications for expired events on the test server.
pub async fn enable_expiry_notifications() -> Option<()> {
    let client = redis::Client::open(test_config().url.as_str()).ok()?;
    let mut conn = client.get_multiplexed_async_connection().await.ok()?;
    redis::cmd("CONFIG")
        .arg("SET")
        .arg("notify-keyspace-events")
        .arg("Kx")
        .query_async::<()>(&mut conn)
        .await
        .ok()?;
    Some(())
}

/// Drop every pub/sub connection on the test server (`CLIENT KILL TYPE
/// pubsub`), returning how many were killed. Simulates the subscription side
/// of a Redis restart or network partition.
pub async fn kill_pubsub_connections() -> i64 {
    let client = redis::Client::open(test_config().url.as_str()).expect("test store URL");
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .expect("test store connection");
    redis::cmd("CLIENT")
        .arg("KILL")
        .arg("TYPE")
        .arg("pubsub")
        .query_async::<i64>(&mut conn)
        .await
        .expect("CLIENT KILL")
}

/// Poll until `check` passes or the deadline expires.
pub async fn wait_for<F, Fut>(what: &str, deadline: Duration, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let started = std::time::Instant::now();
    loop {
        if check().await {
            return;
        }
        assert!(
            started.elapsed() < deadline,
            "timed out after {deadline:?} waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
