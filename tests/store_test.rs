//! Task store integration tests (require a running Redis instance).
#![cfg(feature = "test-services")]

#[allow(dead_code)]
mod common;

use common::{test_store, unique_handler};
use serde_json::json;
use ttl_tasks::{LockState, TaskError, TaskRecord};

#[tokio::test]
async fn test_save_then_atomic_load_round_trips() {
    let Some(store) = test_store().await else { return };
    let handler = unique_handler("jobs/roundtrip");

    let task = TaskRecord::new(&handler, "t1")
        .with_payload(json!({"x": 1}))
        .with_ttl(10);
    store.save(&task).await.unwrap();

    let loaded = store.atomic_load(&handler, "t1").await.unwrap();
    assert_eq!(loaded, task);

    store.clear(&handler, "t1").await.unwrap();
}

#[tokio::test]
async fn test_concurrent_atomic_load_has_exactly_one_winner() {
    let Some(store) = test_store().await else { return };
    let handler = unique_handler("jobs/race");

    let task = TaskRecord::new(&handler, "t1").with_ttl(60);
    store.save(&task).await.unwrap();

    let (a, b) = tokio::join!(
        store.atomic_load(&handler, "t1"),
        store.atomic_load(&handler, "t1"),
    );

    let winners = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one atomic_load may win");
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(TaskError::TaskLocked { .. })));

    store.clear(&handler, "t1").await.unwrap();
}

#[tokio::test]
async fn test_unlock_allows_reload() {
    let Some(store) = test_store().await else { return };
    let handler = unique_handler("jobs/reload");

    let task = TaskRecord::new(&handler, "t1").with_ttl(60);
    store.save(&task).await.unwrap();

    store.atomic_load(&handler, "t1").await.unwrap();
    assert!(matches!(
        store.atomic_load(&handler, "t1").await,
        Err(TaskError::TaskLocked { .. })
    ));

    // the value key persists across executions, so after unlock the task is
    // loadable again
    store.unlock(&handler, "t1").await.unwrap();
    let reloaded = store.atomic_load(&handler, "t1").await.unwrap();
    assert_eq!(reloaded, task);

    store.clear(&handler, "t1").await.unwrap();
}

#[tokio::test]
async fn test_atomic_load_without_saved_value_reports_missing() {
    let Some(store) = test_store().await else { return };
    let handler = unique_handler("jobs/missing");

    assert!(matches!(
        store.atomic_load(&handler, "never-saved").await,
        Err(TaskError::MissingValue { .. })
    ));

    // the SETNX half of the batch ran, so the lock key was left behind
    assert_eq!(store.lock_state(&handler, "never-saved").await, LockState::Locked);

    store.clear(&handler, "never-saved").await.unwrap();
}

#[tokio::test]
async fn test_marker_ttl_is_set_and_bounded() {
    let Some(store) = test_store().await else { return };
    let handler = unique_handler("jobs/ttl");

    let task = TaskRecord::new(&handler, "t1").with_ttl(10);
    store.save(&task).await.unwrap();

    let ttl = store.marker_ttl(&handler, "t1").await.unwrap();
    assert!(ttl > 0 && ttl <= 10, "marker ttl out of bounds: {ttl}");

    // the value key itself never expires
    let loaded = store.atomic_load(&handler, "t1").await.unwrap();
    assert_eq!(loaded.ttl_seconds, 10);

    store.clear(&handler, "t1").await.unwrap();
}

#[tokio::test]
async fn test_save_without_handler_reference_fails() {
    let Some(store) = test_store().await else { return };

    let task = TaskRecord::new("", "t1");
    assert!(matches!(
        store.save(&task).await,
        Err(TaskError::MissingHandler)
    ));
}

#[tokio::test]
async fn test_save_rejects_ids_breaking_the_key_contract() {
    // An id containing ':' would store under keys whose expiry channel
    // decodes to a different (handler, id); an empty id is undispatchable.
    // Both are rejected where the keys are minted.
    let Some(store) = test_store().await else { return };
    let handler = unique_handler("jobs/badid");

    assert!(matches!(
        store.save(&TaskRecord::new(&handler, "a:b")).await,
        Err(TaskError::InvalidId(_))
    ));
    assert!(matches!(
        store.save(&TaskRecord::new(&handler, "")).await,
        Err(TaskError::InvalidId(_))
    ));

    // nothing was written for either attempt
    assert_eq!(store.marker_ttl(&handler, "a:b").await.unwrap(), -2);
}

#[tokio::test]
async fn test_manual_lock_is_exclusive_and_unlock_idempotent() {
    let Some(store) = test_store().await else { return };
    let handler = unique_handler("jobs/manual");

    assert_eq!(store.lock_state(&handler, "t1").await, LockState::Unlocked);

    assert!(store.lock(&handler, "t1").await.unwrap());
    assert!(!store.lock(&handler, "t1").await.unwrap());
    assert_eq!(store.lock_state(&handler, "t1").await, LockState::Locked);

    store.unlock(&handler, "t1").await.unwrap();
    store.unlock(&handler, "t1").await.unwrap();
    assert_eq!(store.lock_state(&handler, "t1").await, LockState::Unlocked);
    assert!(store.lock(&handler, "t1").await.unwrap());

    store.clear(&handler, "t1").await.unwrap();
}

#[tokio::test]
async fn test_clear_removes_all_keys() {
    let Some(store) = test_store().await else { return };
    let handler = unique_handler("jobs/clear");

    let task = TaskRecord::new(&handler, "t1").with_ttl(60);
    store.save(&task).await.unwrap();
    store.lock(&handler, "t1").await.unwrap();

    store.clear(&handler, "t1").await.unwrap();

    assert_eq!(store.lock_state(&handler, "t1").await, LockState::Unlocked);
    assert_eq!(store.marker_ttl(&handler, "t1").await.unwrap(), -2);
    assert!(matches!(
        store.atomic_load(&handler, "t1").await,
        Err(TaskError::MissingValue { .. })
    ));

    store.clear(&handler, "t1").await.unwrap();
}
