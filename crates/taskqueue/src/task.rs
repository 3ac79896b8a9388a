// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task data model: identity, dependency sets, routing hints, and the
//! closed status set a task moves through.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Status a task occupies; `Completed`, `Failed`, and `Cancelled` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Draft,
    Queued,
    Blocked,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Optional routing hints used by the orchestrator's external router.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingHints {
    pub required_capabilities: Vec<String>,
    pub preferred_domains: Vec<String>,
}

/// Outcome payload recorded on completion, failure, or cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub payload: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn ok(payload: Option<serde_json::Value>) -> Self {
        Self { payload, error: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { payload: None, error: Some(message.into()) }
    }
}

/// Input to `TaskQueue::create_task`.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub dependencies: Vec<String>,
    pub worktree_id: Option<String>,
    pub routing_hints: Option<RoutingHints>,
}

/// A work item in the dependency DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub dependencies: BTreeSet<String>,
    pub dependents: BTreeSet<String>,
    pub status: TaskStatus,
    pub worktree_id: Option<String>,
    pub routing_hints: Option<RoutingHints>,
    pub assigned_session_id: Option<String>,
    pub run_id: Option<String>,
    pub created_at_epoch_ms: u64,
    pub queued_at_epoch_ms: Option<u64>,
    pub started_at_epoch_ms: Option<u64>,
    pub completed_at_epoch_ms: Option<u64>,
    pub result: Option<TaskResult>,
    /// Creation order, used only to break priority ties deterministically
    /// when two tasks share both a priority and a millisecond timestamp.
    pub(crate) sequence: u64,
}

impl Task {
    pub(crate) fn new(spec: TaskSpec, now_ms: u64, sequence: u64) -> Self {
        Self {
            id: spec.id,
            title: spec.title,
            description: spec.description,
            priority: spec.priority,
            dependencies: spec.dependencies.into_iter().collect(),
            dependents: BTreeSet::new(),
            status: TaskStatus::Draft,
            worktree_id: spec.worktree_id,
            routing_hints: spec.routing_hints,
            assigned_session_id: None,
            run_id: None,
            created_at_epoch_ms: now_ms,
            queued_at_epoch_ms: None,
            started_at_epoch_ms: None,
            completed_at_epoch_ms: None,
            result: None,
            sequence,
        }
    }

    /// Dependencies not yet satisfied. Per the invariant `blocked_by ⊆
    /// dependencies`, this is always computed rather than stored, so it
    /// can never drift out of sync with the dependency set itself.
    pub fn blocked_by<'a>(&'a self, is_satisfied: impl Fn(&str) -> bool + 'a) -> BTreeSet<&'a str> {
        self.dependencies.iter().map(String::as_str).filter(|d| !is_satisfied(d)).collect()
    }
}
