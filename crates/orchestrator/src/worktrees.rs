// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One [`Monitor`] per watched worktree, each driven by its own spawned
//! poll loop on the interval `Monitor::next_interval` computes, fanning
//! `CycleResult`s out as [`WorktreeEvent`]s on the shared bus. Mirrors the
//! PTY Host's "one task per session" supervision style, scaled down to
//! "one task per worktree".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use basecamp_eventbus::EventBus;
use basecamp_worktree::{GitProbe, Monitor, MonitorConfig, VcsError};
use basecamp_worktree::monitor::{AiTrigger, CycleResult};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::worktree_events::WorktreeEvent;

/// Marker file the admin CLI drops to request a breaker reset out of
/// process (spec.md §6 `worktree reset-breaker <path>`): the CLI has no
/// channel back into a running controller's in-memory `Monitor`, so it
/// leaves a request the monitor's own poll loop picks up and clears.
fn breaker_reset_marker(worktree_path: &Path) -> PathBuf {
    worktree_path.join(".basecamp").join("breaker-reset-requested")
}

/// Drop a breaker-reset request for `worktree_path`. Called by the admin
/// CLI; idempotent (`create_dir_all` + truncate-on-write).
pub fn request_breaker_reset(worktree_path: &Path) -> std::io::Result<()> {
    let marker = breaker_reset_marker(worktree_path);
    if let Some(dir) = marker.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(marker, b"")
}

fn take_breaker_reset_request(worktree_path: &Path) -> bool {
    let marker = breaker_reset_marker(worktree_path);
    if marker.exists() {
        let _ = std::fs::remove_file(&marker);
        true
    } else {
        false
    }
}

struct Watched {
    cancel: CancellationToken,
    tripped: Arc<std::sync::atomic::AtomicBool>,
}

/// Registry of active worktree monitors, each backed by a spawned poll
/// loop. Adding the same path twice is a no-op against the existing
/// watch; removing cancels its loop and lets it publish `Removed` on its
/// way out.
#[derive(Default)]
pub struct WorktreeRegistry {
    watched: Mutex<HashMap<PathBuf, Watched>>,
}

impl WorktreeRegistry {
    pub fn new() -> Self {
        Self { watched: Mutex::new(HashMap::new()) }
    }

    /// Begin watching `path` with `config`, publishing every cycle's
    /// outcome on `events`. No-op if `path` is already watched.
    pub async fn watch(&self, path: PathBuf, config: MonitorConfig, events: Arc<EventBus<WorktreeEvent>>) {
        let mut watched = self.watched.lock().await;
        if watched.contains_key(&path) {
            return;
        }

        let cancel = CancellationToken::new();
        let tripped = Arc::new(std::sync::atomic::AtomicBool::new(false));
        watched.insert(path.clone(), Watched { cancel: cancel.clone(), tripped: tripped.clone() });
        drop(watched);

        tokio::spawn(poll_loop(path, GitProbe, config, events, cancel, tripped));
    }

    /// Stop watching `path`. The loop notices on its next wakeup and
    /// exits without publishing a `Removed` event (the caller already
    /// knows — it asked for the removal).
    pub async fn unwatch(&self, path: &Path) {
        if let Some(watch) = self.watched.lock().await.remove(path) {
            watch.cancel.cancel();
        }
    }

    pub async fn is_watched(&self, path: &Path) -> bool {
        self.watched.lock().await.contains_key(path)
    }

    pub async fn is_tripped(&self, path: &Path) -> bool {
        self.watched
            .lock()
            .await
            .get(path)
            .is_some_and(|w| w.tripped.load(std::sync::atomic::Ordering::Acquire))
    }

    pub async fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched.lock().await.keys().cloned().collect()
    }
}

async fn poll_loop(
    path: PathBuf,
    probe: GitProbe,
    config: MonitorConfig,
    events: Arc<EventBus<WorktreeEvent>>,
    cancel: CancellationToken,
    tripped: Arc<std::sync::atomic::AtomicBool>,
) {
    let ai_delay = config.ai_buffer_delay;
    let mut monitor = Monitor::new(path.clone(), probe, config);
    let mut debouncer = basecamp_worktree::monitor::SummaryDebouncer::new();

    loop {
        let interval = monitor.next_interval();
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        if take_breaker_reset_request(&path) {
            monitor.reset();
            tripped.store(false, std::sync::atomic::Ordering::Release);
        }

        match monitor.run_cycle(false).await {
            CycleResult::Unchanged | CycleResult::Skipped | CycleResult::Retrying => {}
            CycleResult::BreakerTripped(snapshot) => {
                tripped.store(true, std::sync::atomic::Ordering::Release);
                events.publish(WorktreeEvent::BreakerTripped { snapshot });
            }
            CycleResult::Removed => {
                events.publish(WorktreeEvent::Removed { path: path.clone() });
                return;
            }
            CycleResult::Changed { snapshot, ai_trigger } => {
                events.publish(WorktreeEvent::Changed { snapshot });
                match ai_trigger {
                    AiTrigger::Cancel => debouncer.cancel(),
                    AiTrigger::Immediate => {
                        let fired_path = path.clone();
                        tokio::spawn(debouncer.schedule(std::time::Duration::ZERO, move || summarize_hook(fired_path)));
                    }
                    AiTrigger::Debounced => {
                        let fired_path = path.clone();
                        tokio::spawn(debouncer.schedule(ai_delay, move || summarize_hook(fired_path)));
                    }
                }
            }
        }
    }
}

/// Extension point for whatever turns a changed worktree into a written
/// AI summary. No summarization backend is wired up here — the trigger
/// timing (immediate on clean->dirty, debounced while dirty, cancelled on
/// clean) is the contractual part; this hook just logs so the debounce
/// behavior is observable.
async fn summarize_hook(path: PathBuf) {
    tracing::debug!(path = %path.display(), "ai summary trigger fired");
}

/// Translate a [`VcsError`] into the same breaker-relevant distinction
/// `Monitor::run_cycle` already makes, for callers that want to log
/// without duplicating that match.
pub fn is_recoverable(error: &VcsError) -> bool {
    matches!(error, VcsError::IndexLocked)
}

#[cfg(test)]
#[path = "worktrees_tests.rs"]
mod tests;
