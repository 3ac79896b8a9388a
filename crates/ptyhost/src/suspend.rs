// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Suspend/resume handshake and global pause/resume for OS sleep handling.
//!
//! On `pause-all`, all streaming stops and pending handshake timers are
//! cleared. On `resume-all`, the host sends a `health-check` ping and
//! starts a fallback timer; a `pong` within the timeout cancels the
//! fallback and starts the regular health-check interval. A late `pong`
//! after the fallback already fired is ignored. Rapid pause/resume cycles
//! must not accumulate fallback timers — starting a new handshake always
//! supersedes any pending one.

use std::time::{Duration, Instant};

/// Global streaming pause state plus the resume handshake.
#[derive(Debug)]
pub struct SuspendController {
    paused: bool,
    fallback_timeout: Duration,
    pending: Option<PendingHandshake>,
}

#[derive(Debug, Clone, Copy)]
struct PendingHandshake {
    deadline: Instant,
}

impl SuspendController {
    pub fn new(fallback_timeout: Duration) -> Self {
        Self { paused: false, fallback_timeout, pending: None }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// `pause-all`: stop streaming and drop any in-flight handshake.
    pub fn pause_all(&mut self) {
        self.paused = true;
        self.pending = None;
    }

    /// `resume-all`: begin a fresh handshake, discarding any prior pending
    /// one so rapid resume cycles don't accumulate fallback timers.
    pub fn resume_all(&mut self, now: Instant) {
        self.paused = false;
        self.pending = Some(PendingHandshake { deadline: now + self.fallback_timeout });
    }

    /// The controller acknowledged with `pong`. Returns `true` if this
    /// cancelled a live handshake (so the caller should start the regular
    /// health-check interval), `false` if there was nothing pending or the
    /// fallback had already elapsed (a late ack, ignored).
    pub fn on_pong(&mut self, now: Instant) -> bool {
        match self.pending.take() {
            Some(h) if now <= h.deadline => true,
            _ => false,
        }
    }

    /// Poll for fallback expiry. Returns `true` exactly once, the first
    /// time this is called after the deadline has passed with no `pong`
    /// received; clears the pending handshake so it isn't reported twice.
    pub fn check_fallback_expired(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(h) if now > h.deadline => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn has_pending_handshake(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
#[path = "suspend_tests.rs"]
mod tests;
