// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

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
fn spawn_request_round_trips() {
    let req = Request::Spawn { session_id: "s1".into(), params: params() };
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("\"type\":\"spawn\""));
    let back: Request = serde_json::from_str(&json).unwrap();
    assert_eq!(back.session_id(), Some("s1"));
}

#[test]
fn global_requests_have_no_session_id() {
    assert_eq!(Request::HealthCheck.session_id(), None);
    assert_eq!(Request::GetAllSnapshots.session_id(), None);
    assert_eq!(Request::PauseAll.session_id(), None);
    assert_eq!(Request::ResumeAll.session_id(), None);
    assert_eq!(Request::Dispose.session_id(), None);
}

#[test]
fn scoped_requests_carry_session_id() {
    assert_eq!(Request::Kill { session_id: "a".into() }.session_id(), Some("a"));
    assert_eq!(
        Request::Resize { session_id: "a".into(), cols: 1, rows: 1 }.session_id(),
        Some("a")
    );
}

#[test]
fn event_tag_matches_kebab_case() {
    let ev = Event::TerminalStatus { session_id: "s1".into(), status: FlowStatus::Paused };
    let json = serde_json::to_string(&ev).unwrap();
    assert!(json.contains("\"type\":\"terminal-status\""));
    assert!(json.contains("\"paused\""));
}

#[test]
fn spawn_result_err_round_trips() {
    let ev = Event::SpawnResult {
        session_id: "s1".into(),
        result: Err(HostError::new(crate::error::ErrorCode::SpawnFailed, "boom")),
    };
    let json = serde_json::to_string(&ev).unwrap();
    let back: Event = serde_json::from_str(&json).unwrap();
    match back {
        Event::SpawnResult { result: Err(e), .. } => assert_eq!(e.message, "boom"),
        _ => panic!("expected SpawnResult err"),
    }
}
