// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session (terminal) data model: identity, attributes, and the
//! invariants the host enforces across its lifecycle.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::state_machine::SessionState as InferredState;

/// Kind of session the PTY Host is supervising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Shell,
    Agent,
    DevPreview,
}

/// Streaming policy tier: `active` sessions get a ring and fine polling;
/// `background` sessions are drained to scrollback and polled coarsely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityTier {
    Active,
    Background,
}

/// Parameters used to spawn a session's child process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnParams {
    pub cwd: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cols: u16,
    pub rows: u16,
    pub kind: SessionKind,
    pub agent_type: Option<String>,
    pub worktree_id: Option<String>,
    pub project_id: Option<String>,
}

/// Trashed-session pending-deletion marker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrashInfo {
    pub trashed_at_epoch_ms: u64,
    pub expires_at_epoch_ms: u64,
}

/// A supervised terminal session.
///
/// Invariants enforced by the host: exactly one running OS process per
/// untrashed session; `state` is always one of the five allowed states;
/// `last_output_time >= spawn_time`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub cwd: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cols: u16,
    pub rows: u16,
    pub kind: SessionKind,
    pub agent_type: Option<String>,
    pub worktree_id: Option<String>,
    pub project_id: Option<String>,

    pub spawn_time_epoch_ms: u64,
    pub last_input_time_epoch_ms: Option<u64>,
    pub last_output_time_epoch_ms: u64,
    pub last_check_time_epoch_ms: Option<u64>,

    pub state: InferredState,
    pub last_state_change_epoch_ms: u64,

    pub activity_tier: ActivityTier,
    pub trashed: Option<TrashInfo>,

    pub child_pid: Option<u32>,
}

pub fn now_epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

impl Session {
    /// Construct a new session for a just-accepted `spawn` request.
    pub fn new(id: String, params: SpawnParams) -> Self {
        let now = now_epoch_ms();
        Self {
            id,
            cwd: params.cwd,
            command: params.command,
            args: params.args,
            env: params.env,
            cols: params.cols,
            rows: params.rows,
            kind: params.kind,
            agent_type: params.agent_type,
            worktree_id: params.worktree_id,
            project_id: params.project_id,
            spawn_time_epoch_ms: now,
            last_input_time_epoch_ms: None,
            last_output_time_epoch_ms: now,
            last_check_time_epoch_ms: None,
            state: InferredState::Idle,
            last_state_change_epoch_ms: now,
            activity_tier: ActivityTier::Active,
            trashed: None,
            child_pid: None,
        }
    }

    /// Record an output chunk, advancing `last_output_time`. Per invariant,
    /// this can never move the timestamp backwards before `spawn_time`.
    pub fn record_output(&mut self) {
        self.last_output_time_epoch_ms = now_epoch_ms().max(self.spawn_time_epoch_ms);
    }

    pub fn record_input(&mut self) {
        self.last_input_time_epoch_ms = Some(now_epoch_ms());
    }

    /// Apply an accepted state transition. Per invariant,
    /// `last_state_change` is monotonically non-decreasing; transitions
    /// from a terminal state are rejected (callers must restart instead).
    pub fn apply_transition(&mut self, next: InferredState) -> Result<(), &'static str> {
        if self.state.is_terminal() {
            return Err("cannot transition out of a terminal state; restart instead");
        }
        let now = now_epoch_ms().max(self.last_state_change_epoch_ms);
        self.state = next;
        self.last_state_change_epoch_ms = now;
        Ok(())
    }

    pub fn mark_trashed(&mut self, expiry_ms: u64) {
        let now = now_epoch_ms();
        self.trashed = Some(TrashInfo { trashed_at_epoch_ms: now, expires_at_epoch_ms: now + expiry_ms });
    }

    pub fn restore(&mut self) {
        self.trashed = None;
    }

    pub fn is_expired(&self) -> bool {
        match self.trashed {
            Some(t) => now_epoch_ms() >= t.expires_at_epoch_ms,
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
