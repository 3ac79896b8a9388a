// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the cross-crate scenario tests in `tests/`.
//!
//! These tests exercise the system as a whole — ring framing across a
//! shared buffer, task assignment through a live `System` — rather than
//! a single crate's internals, which the unit tests alongside each
//! module already cover.

use std::collections::HashMap;
use std::path::PathBuf;

use basecamp::config::ControllerConfig;
use basecamp_ptyhost::session::{SessionKind, SpawnParams};

/// A `ControllerConfig` pointed at a throwaway state directory with fast
/// worktree polling, suitable for driving a real `System` in a test.
pub fn test_config(state_dir: &std::path::Path) -> ControllerConfig {
    ControllerConfig {
        state_dir: Some(state_dir.to_path_buf()),
        ptyhost_bin: PathBuf::from("/bin/cat"),
        breaker_threshold: 2,
        worktree_base_interval_ms: 10,
        worktree_max_interval_ms: 20,
        ai_buffer_delay_ms: 5,
        log_format: "text".to_owned(),
        log_level: "error".to_owned(),
    }
}

/// A minimal agent session spawn request; `/bin/cat` stands in for a
/// real agent binary and just echoes whatever it is sent.
pub fn spawn_params(worktree_id: Option<&str>) -> SpawnParams {
    SpawnParams {
        cwd: "/tmp".to_owned(),
        command: "bash".to_owned(),
        args: Vec::new(),
        env: HashMap::new(),
        cols: 80,
        rows: 24,
        kind: SessionKind::Agent,
        agent_type: None,
        worktree_id: worktree_id.map(str::to_owned),
        project_id: None,
    }
}
