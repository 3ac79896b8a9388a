// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn candidate(state: SessionState, trigger: Trigger, confidence: f64) -> Candidate {
    Candidate { state, trigger, confidence, cause: "test".into() }
}

#[test]
fn user_input_moves_idle_to_working() {
    // Weaker than the seeded 1.0 confidence, but idle -> working escalates
    // priority, so it is accepted anyway.
    let next = evaluate(SessionState::Idle, 1.0, &candidate(SessionState::Working, Trigger::UserInput, 0.9));
    assert_eq!(next, Some(SessionState::Working));
}

#[test]
fn low_confidence_below_threshold_rejected() {
    let next = evaluate(SessionState::Idle, 1.0, &candidate(SessionState::Working, Trigger::UserInput, 0.1));
    assert_eq!(next, None);
}

#[test]
fn quiescence_moves_working_to_idle() {
    // A downgrade in priority, but same-or-stronger confidence (0.9 >= 0.9)
    // still replaces the current state immediately.
    let next =
        evaluate(SessionState::Working, 0.9, &candidate(SessionState::Idle, Trigger::OutputQuiescence, 0.9));
    assert_eq!(next, Some(SessionState::Idle));
}

#[test]
fn weaker_signal_cannot_downgrade_the_current_state() {
    // Lower confidence than the current state's own, and working -> idle
    // is a downgrade in priority, so this must be rejected.
    let next =
        evaluate(SessionState::Working, 0.95, &candidate(SessionState::Idle, Trigger::OutputQuiescence, 0.61));
    assert_eq!(next, None);
}

#[test]
fn waiting_cue_escalates_from_working() {
    let next =
        evaluate(SessionState::Working, 0.9, &candidate(SessionState::Waiting, Trigger::WaitingCue, 0.9));
    assert_eq!(next, Some(SessionState::Waiting));
}

#[test]
fn weaker_signal_still_escalates_priority() {
    // Below the current state's own confidence, but waiting is a strictly
    // higher priority than working, so escalation is allowed regardless.
    let next =
        evaluate(SessionState::Working, 0.95, &candidate(SessionState::Waiting, Trigger::WaitingCue, 0.71));
    assert_eq!(next, Some(SessionState::Waiting));
}

#[test]
fn terminal_states_always_accepted_regardless_of_confidence() {
    let next = evaluate(SessionState::Working, 0.9, &candidate(SessionState::Failed, Trigger::Failure, 0.0));
    assert_eq!(next, Some(SessionState::Failed));
}

#[test]
fn terminal_state_rejects_all_further_candidates() {
    let next = evaluate(SessionState::Completed, 1.0, &candidate(SessionState::Idle, Trigger::Manual, 1.0));
    assert_eq!(next, None);
}

#[test]
fn duplicate_state_is_suppressed() {
    let next =
        evaluate(SessionState::Working, 0.9, &candidate(SessionState::Working, Trigger::UserInput, 0.9));
    assert_eq!(next, None);
}

#[test]
fn composite_detector_tracks_accepted_transitions() {
    let mut det = CompositeDetector::new(SessionState::Idle);
    assert_eq!(
        det.feed(&candidate(SessionState::Working, Trigger::UserInput, 0.9)),
        Some(SessionState::Working)
    );
    assert_eq!(det.current(), SessionState::Working);
    // A low-confidence duplicate-ish signal for the same target is rejected.
    assert_eq!(det.feed(&candidate(SessionState::Working, Trigger::UserInput, 0.9)), None);
    assert_eq!(
        det.feed(&candidate(SessionState::Completed, Trigger::Completion, 0.99)),
        Some(SessionState::Completed)
    );
    // Once terminal, nothing further is accepted.
    assert_eq!(det.feed(&candidate(SessionState::Idle, Trigger::Manual, 1.0)), None);
}
