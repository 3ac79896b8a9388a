// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One poller per worktree: adaptive-interval VCS diffing, deterministic
//! change-hash dedup, mood classification, and a debounced downstream
//! AI-summary trigger, gated by a consecutive-failure circuit breaker.
//!
//! Cancelling and replacing a `CancellationToken` is how "coalesce if
//! already scheduled" and "cancel if clean" are both expressed without
//! extra bookkeeping.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::breaker::CircuitBreaker;
use crate::hash::{hash_delta, FileDelta};
use crate::vcs::{VcsError, VcsProbe};

/// Categorical classification of a worktree's change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Stable,
    Dirty,
    Error,
}

/// A point-in-time view of a worktree's change set, emitted whenever the
/// change-set hash moves.
#[derive(Debug, Clone)]
pub struct WorktreeSnapshot {
    pub path: PathBuf,
    pub branch: Option<String>,
    pub modified_count: usize,
    pub deltas: Vec<FileDelta>,
    pub mood: Mood,
    pub summary: Option<String>,
    pub last_activity_epoch_ms: u64,
    pub hash: String,
}

/// Configurable knobs per spec.md §9 Open Questions (not contractual).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub base_interval: Duration,
    pub max_interval: Duration,
    pub adaptive_backoff: bool,
    pub ai_buffer_delay: Duration,
    pub breaker_threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(30),
            adaptive_backoff: true,
            ai_buffer_delay: Duration::from_secs(10),
            breaker_threshold: 3,
        }
    }
}

/// What the monitor wants done about the downstream AI summary after one
/// cycle's change-set transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiTrigger {
    /// Clean -> dirty: summarize right away.
    Immediate,
    /// Still dirty: (re)schedule a debounced summary.
    Debounced,
    /// Became clean: cancel any pending debounced summary.
    Cancel,
}

/// Outcome of one `Monitor::run_cycle` call.
#[derive(Debug, Clone)]
pub enum CycleResult {
    /// Hash unchanged since last emission; nothing to do.
    Unchanged,
    /// A recoverable error ("index.lock") was logged and skipped; does not
    /// count against the circuit breaker.
    Skipped,
    /// A non-recoverable error was recorded but the breaker has not yet
    /// tripped.
    Retrying,
    /// The breaker just tripped on this call; carries an error snapshot.
    BreakerTripped(WorktreeSnapshot),
    /// The worktree directory no longer exists; polling should stop.
    Removed,
    /// The change set moved; carries the new snapshot and what to do about
    /// the downstream AI summary.
    Changed { snapshot: WorktreeSnapshot, ai_trigger: AiTrigger },
}

fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Per-worktree adaptive poller. Owns the circuit breaker and the hash/
/// dirty-state needed to decide what changed between cycles; does not own
/// the interval timer itself so callers can drive it however fits (a
/// `tokio::select!` loop, a test harness calling `run_cycle` directly).
pub struct Monitor<P: VcsProbe> {
    path: PathBuf,
    probe: P,
    config: MonitorConfig,
    breaker: CircuitBreaker,
    last_hash: Option<String>,
    was_dirty: bool,
    last_activity_epoch_ms: u64,
    last_op_duration: Duration,
}

impl<P: VcsProbe> Monitor<P> {
    pub fn new(path: PathBuf, probe: P, config: MonitorConfig) -> Self {
        let threshold = config.breaker_threshold;
        Self {
            path,
            probe,
            config,
            breaker: CircuitBreaker::new(threshold),
            last_hash: None,
            was_dirty: false,
            last_activity_epoch_ms: 0,
            last_op_duration: Duration::ZERO,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_tripped(&self) -> bool {
        self.breaker.is_tripped()
    }

    /// Manual refresh entry point: resets the breaker so polling resumes.
    pub fn reset(&mut self) {
        self.breaker.reset();
    }

    /// Next polling interval per spec.md §4.5 step 7:
    /// `min(max_interval, max(base_interval, ceil(Δt * 1.5)))`.
    pub fn next_interval(&self) -> Duration {
        if !self.config.adaptive_backoff {
            return self.config.base_interval;
        }
        let scaled = self.last_op_duration.mul_f64(1.5);
        scaled.clamp(self.config.base_interval, self.config.max_interval)
    }

    /// Run one polling cycle. `force_refresh` bypasses the hash-unchanged
    /// short-circuit (used by a manual refresh request).
    pub async fn run_cycle(&mut self, force_refresh: bool) -> CycleResult {
        if self.breaker.is_tripped() {
            return CycleResult::Retrying;
        }

        let t0 = std::time::Instant::now();
        let status = match self.probe.status(&self.path).await {
            Ok(status) => status,
            Err(VcsError::DirectoryMissing) => {
                self.last_op_duration = t0.elapsed();
                return CycleResult::Removed;
            }
            Err(VcsError::IndexLocked) => {
                tracing::debug!(path = %self.path.display(), "index.lock present, skipping cycle");
                self.last_op_duration = t0.elapsed();
                return CycleResult::Skipped;
            }
            Err(e) => {
                let tripped = self.breaker.record_failure();
                self.last_op_duration = t0.elapsed();
                if tripped {
                    tracing::warn!(path = %self.path.display(), error = %e, "circuit breaker tripped");
                    return CycleResult::BreakerTripped(WorktreeSnapshot {
                        path: self.path.clone(),
                        branch: None,
                        modified_count: 0,
                        deltas: Vec::new(),
                        mood: Mood::Error,
                        summary: Some(e.to_string()),
                        last_activity_epoch_ms: self.last_activity_epoch_ms,
                        hash: self.last_hash.clone().unwrap_or_default(),
                    });
                }
                return CycleResult::Retrying;
            }
        };
        self.breaker.record_success();

        let hash = hash_delta(&status.deltas);
        self.last_op_duration = t0.elapsed();
        if self.last_hash.as_deref() == Some(hash.as_str()) && !force_refresh {
            return CycleResult::Unchanged;
        }

        let is_dirty = !status.deltas.is_empty();
        if is_dirty {
            self.last_activity_epoch_ms = now_epoch_ms();
        }
        let mood = if is_dirty { Mood::Dirty } else { Mood::Stable };

        let ai_trigger = if is_dirty && !self.was_dirty {
            AiTrigger::Immediate
        } else if is_dirty {
            AiTrigger::Debounced
        } else {
            AiTrigger::Cancel
        };
        self.was_dirty = is_dirty;
        self.last_hash = Some(hash.clone());

        CycleResult::Changed {
            snapshot: WorktreeSnapshot {
                path: self.path.clone(),
                branch: status.branch,
                modified_count: status.deltas.len(),
                deltas: status.deltas,
                mood,
                summary: None,
                last_activity_epoch_ms: self.last_activity_epoch_ms,
                hash,
            },
            ai_trigger,
        }
    }
}

/// Single-slot debounced scheduler for the downstream AI summary.
///
/// Scheduling while a timer is already pending cancels and replaces it
/// (coalescing re-triggers into the newest deadline); `cancel` clears it
/// outright when the worktree goes clean. Uses a `CancellationToken` per
/// attempt rather than a raw `JoinHandle`, so cancellation is cooperative
/// and race-free against a concurrently firing timer.
#[derive(Debug, Default)]
pub struct SummaryDebouncer {
    token: Option<CancellationToken>,
}

impl SummaryDebouncer {
    pub fn new() -> Self {
        Self { token: None }
    }

    pub fn is_pending(&self) -> bool {
        self.token.is_some()
    }

    /// (Re)schedule `on_fire` after `delay`, cancelling any prior pending
    /// timer first. The returned future must be spawned by the caller.
    pub fn schedule<F, Fut>(&mut self, delay: Duration, on_fire: F) -> impl Future<Output = ()> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => { on_fire().await; }
            }
        }
    }

    /// Cancel any pending debounced summary without scheduling a new one.
    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
