// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn params() -> SpawnParams {
    SpawnParams {
        cwd: "/tmp".into(),
        command: "bash".into(),
        args: vec![],
        env: HashMap::new(),
        cols: 80,
        rows: 24,
        kind: SessionKind::Shell,
        agent_type: None,
        worktree_id: None,
        project_id: None,
    }
}

#[test]
fn new_session_starts_idle_with_output_after_spawn() {
    let s = Session::new("s1".into(), params());
    assert_eq!(s.state, InferredState::Idle);
    assert!(s.last_output_time_epoch_ms >= s.spawn_time_epoch_ms);
}

#[test]
fn last_state_change_never_decreases() {
    let mut s = Session::new("s1".into(), params());
    let before = s.last_state_change_epoch_ms;
    s.apply_transition(InferredState::Working).unwrap();
    assert!(s.last_state_change_epoch_ms >= before);
}

#[test]
fn terminal_state_rejects_further_transitions() {
    let mut s = Session::new("s1".into(), params());
    s.apply_transition(InferredState::Completed).unwrap();
    assert!(s.apply_transition(InferredState::Idle).is_err());
}

#[test]
fn trash_and_restore_round_trip() {
    let mut s = Session::new("s1".into(), params());
    s.mark_trashed(0);
    assert!(s.trashed.is_some());
    assert!(s.is_expired());
    s.restore();
    assert!(s.trashed.is_none());
    assert!(!s.is_expired());
}
