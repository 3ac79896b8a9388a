// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use basecamp_eventbus::EventBus;

use super::*;
use crate::worktree_events::WorktreeEventKind;

fn fast_config() -> MonitorConfig {
    MonitorConfig {
        base_interval: Duration::from_millis(10),
        max_interval: Duration::from_millis(20),
        adaptive_backoff: false,
        ai_buffer_delay: Duration::from_millis(5),
        breaker_threshold: 2,
    }
}

#[tokio::test]
async fn watch_is_idempotent_for_the_same_path() {
    let registry = WorktreeRegistry::new();
    let events = Arc::new(EventBus::new());
    let dir = tempfile::tempdir().unwrap();

    registry.watch(dir.path().to_path_buf(), fast_config(), events.clone()).await;
    registry.watch(dir.path().to_path_buf(), fast_config(), events.clone()).await;

    assert_eq!(registry.watched_paths().await.len(), 1);
}

#[tokio::test]
async fn unwatch_stops_tracking_the_path() {
    let registry = WorktreeRegistry::new();
    let events = Arc::new(EventBus::new());
    let dir = tempfile::tempdir().unwrap();

    registry.watch(dir.path().to_path_buf(), fast_config(), events).await;
    assert!(registry.is_watched(dir.path()).await);

    registry.unwatch(dir.path()).await;
    assert!(!registry.is_watched(dir.path()).await);
}

#[tokio::test]
async fn removed_worktree_publishes_removed_event_and_drops_out_of_the_registry() {
    let registry = WorktreeRegistry::new();
    let events: Arc<EventBus<WorktreeEvent>> = Arc::new(EventBus::new());
    let (tx, rx) = std::sync::mpsc::channel();
    events.subscribe(WorktreeEventKind::Removed, move |envelope| {
        let _ = tx.send(envelope.payload.clone());
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().to_path_buf();
    registry.watch(path.clone(), fast_config(), events).await;

    // Deleting the directory out from under the monitor makes the next
    // cycle observe `DirectoryMissing`.
    std::fs::remove_dir_all(&path).unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if rx.try_recv().is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("removed event should fire once the directory disappears");
}

#[tokio::test]
async fn request_breaker_reset_writes_a_marker_file_that_gets_consumed_once() {
    let dir = tempfile::tempdir().unwrap();
    request_breaker_reset(dir.path()).unwrap();

    assert!(take_breaker_reset_request(dir.path()));
    assert!(!take_breaker_reset_request(dir.path()));
}
