// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between a controller and the PTY Host: the closed set of
//! requests the host accepts and the events it emits, per session.

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::screen::ScreenSnapshot;
use crate::session::{ActivityTier, SessionKind, SpawnParams};
use crate::state_machine::{SessionState, Trigger};

/// A request sent to the PTY Host, addressed to a session id where
/// applicable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Request {
    Spawn { session_id: String, params: SpawnParams },
    Write { session_id: String, bytes: Vec<u8> },
    Submit { session_id: String, line: String },
    Resize { session_id: String, cols: u16, rows: u16 },
    Kill { session_id: String },
    Trash { session_id: String, expiry_ms: u64 },
    Restore { session_id: String },
    SetActivityTier { session_id: String, tier: ActivityTier },
    WakeTerminal { session_id: String },
    GetSnapshot { session_id: String },
    GetAllSnapshots,
    ReplayHistory { session_id: String, lines: usize },
    /// Offer a state-machine candidate out of band (e.g. a controller-side
    /// heuristic or an explicit user action) rather than waiting for the
    /// output-pump's own detectors. Answered with `transition-result`.
    TransitionState { session_id: String, state: SessionState, trigger: Trigger, confidence: f64, cause: String },
    HealthCheck,
    PauseAll,
    ResumeAll,
    Dispose,
}

impl Request {
    /// The session a request targets, if any (global requests return `None`).
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Spawn { session_id, .. }
            | Self::Write { session_id, .. }
            | Self::Submit { session_id, .. }
            | Self::Resize { session_id, .. }
            | Self::Kill { session_id }
            | Self::Trash { session_id, .. }
            | Self::Restore { session_id }
            | Self::SetActivityTier { session_id, .. }
            | Self::WakeTerminal { session_id }
            | Self::GetSnapshot { session_id }
            | Self::ReplayHistory { session_id, .. }
            | Self::TransitionState { session_id, .. } => Some(session_id),
            Self::GetAllSnapshots | Self::HealthCheck | Self::PauseAll | Self::ResumeAll
            | Self::Dispose => None,
        }
    }
}

/// An event emitted by the PTY Host, either global or scoped to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    Ready,
    Data { session_id: String, bytes: Vec<u8> },
    Exit { session_id: String, code: Option<i32>, signal: Option<i32> },
    Error { session_id: Option<String>, error: HostError },
    SpawnResult { session_id: String, result: Result<(), HostError> },
    WakeResult { session_id: String, result: Result<ScreenSnapshot, HostError> },
    AgentState {
        session_id: String,
        prev: SessionState,
        next: SessionState,
        timestamp_epoch_ms: u64,
        trigger: Trigger,
        confidence: f64,
        worktree_id: Option<String>,
    },
    TerminalTrashed { session_id: String },
    TerminalRestored { session_id: String },
    TerminalStatus { session_id: String, status: FlowStatus },
    /// Reply to `transition-state`: whether the candidate cleared its
    /// threshold and, either way, the session's state after the attempt.
    TransitionResult { session_id: String, accepted: bool, state: SessionState },
    HostThrottled { reason: String },
    Pong,
}

/// Flow-control status carried by `terminal-status` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Paused,
    Resumed,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
