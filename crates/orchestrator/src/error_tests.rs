// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn task_queue_not_found_maps_to_not_found_kind_and_exit_code_three() {
    let err: ControllerError = TaskQueueError::NotFound("t1".to_owned()).into();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.kind.exit_code(), 3);
}

#[test]
fn cycle_detected_maps_to_cycle_detected_kind() {
    let err: ControllerError =
        TaskQueueError::CycleDetected { task: "a".to_owned(), dependency: "b".to_owned() }.into();
    assert_eq!(err.kind, ErrorKind::CycleDetected);
    assert_eq!(err.kind.http_status(), 422);
}

#[test]
fn circuit_open_exit_code_is_four() {
    assert_eq!(ErrorKind::CircuitOpen.exit_code(), 4);
}

#[test]
fn display_includes_kind_and_reference_id() {
    let err = ControllerError::new(ErrorKind::Timeout, "vcs command timed out");
    let rendered = err.to_string();
    assert!(rendered.contains("TIMEOUT"));
    assert!(rendered.contains(&err.reference_id));
}
