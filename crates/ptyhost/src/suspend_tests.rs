// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn resume_all_starts_pending_handshake() {
    let mut s = SuspendController::new(Duration::from_secs(5));
    let now = Instant::now();
    s.resume_all(now);
    assert!(!s.is_paused());
    assert!(s.has_pending_handshake());
}

#[test]
fn pong_within_timeout_cancels_fallback() {
    let mut s = SuspendController::new(Duration::from_secs(5));
    let now = Instant::now();
    s.resume_all(now);
    assert!(s.on_pong(now + Duration::from_secs(1)));
    assert!(!s.has_pending_handshake());
}

#[test]
fn late_pong_after_fallback_is_ignored() {
    let mut s = SuspendController::new(Duration::from_secs(5));
    let now = Instant::now();
    s.resume_all(now);
    assert!(!s.on_pong(now + Duration::from_secs(10)));
}

#[test]
fn fallback_expiry_reported_once() {
    let mut s = SuspendController::new(Duration::from_secs(5));
    let now = Instant::now();
    s.resume_all(now);
    assert!(!s.check_fallback_expired(now + Duration::from_secs(1)));
    assert!(s.check_fallback_expired(now + Duration::from_secs(6)));
    assert!(!s.check_fallback_expired(now + Duration::from_secs(7)));
}

#[test]
fn pause_all_clears_pending_handshake() {
    let mut s = SuspendController::new(Duration::from_secs(5));
    let now = Instant::now();
    s.resume_all(now);
    s.pause_all();
    assert!(s.is_paused());
    assert!(!s.has_pending_handshake());
}

#[test]
fn rapid_resume_cycles_do_not_accumulate_timers() {
    let mut s = SuspendController::new(Duration::from_secs(5));
    let now = Instant::now();
    s.resume_all(now);
    s.resume_all(now + Duration::from_secs(1));
    s.resume_all(now + Duration::from_secs(2));
    // Only the most recent handshake's deadline matters.
    assert!(!s.check_fallback_expired(now + Duration::from_secs(6)));
    assert!(s.check_fallback_expired(now + Duration::from_secs(8)));
}
