// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller-side session table: the live view of every session the PTY
//! Host is supervising, kept current by folding its `protocol::Event`
//! stream in. Mirrors the teacher's `transport::state::Store` shape — one
//! `RwLock`-guarded map behind an `Arc`, mutated only through named
//! methods so the session invariants (spec.md §3) never drift.

use std::collections::HashMap;
use std::sync::Arc;

use basecamp_ptyhost::protocol::Event as HostEvent;
use basecamp_ptyhost::session::{ActivityTier, Session, SessionKind, SpawnParams};
use basecamp_ptyhost::state_machine::SessionState;
use tokio::sync::RwLock;

/// A candidate session the orchestrator may assign work to.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: String,
    pub worktree_id: Option<String>,
    pub agent_type: Option<String>,
}

/// Live table of supervised sessions, updated from PTY Host events.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self { sessions: RwLock::new(HashMap::new()) }
    }

    /// Register a session the controller just asked the host to spawn,
    /// in `idle` ahead of the host's own `spawn-result`/`agent-state`
    /// confirmation, so assignment bookkeeping has somewhere to land.
    pub async fn record_spawn_request(&self, id: String, params: SpawnParams) {
        let session = Session::new(id.clone(), params);
        self.sessions.write().await.insert(id, session);
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Session> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn remove(&self, id: &str) -> Option<Session> {
        self.sessions.write().await.remove(id)
    }

    /// Sessions eligible for task assignment: `kind = agent`, state in
    /// `{idle, waiting}`, untrashed, and — when the task carries a
    /// worktree binding — not already bound to a *different* worktree
    /// (spec.md §4.8 step 2).
    pub async fn available_for_assignment(&self, worktree_id: Option<&str>) -> Vec<SessionSummary> {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.kind == SessionKind::Agent)
            .filter(|s| matches!(s.state, SessionState::Idle | SessionState::Waiting))
            .filter(|s| s.trashed.is_none())
            .filter(|s| match (worktree_id, &s.worktree_id) {
                (Some(task_wt), Some(session_wt)) => task_wt == session_wt,
                _ => true,
            })
            .map(|s| SessionSummary { id: s.id.clone(), worktree_id: s.worktree_id.clone(), agent_type: s.agent_type.clone() })
            .collect()
    }

    /// Fold one PTY Host event into the table. Returns the session id and
    /// its new state when the event is an accepted `agent-state`
    /// transition, since that is the signal the orchestrator reacts to.
    pub async fn apply_host_event(&self, event: &HostEvent) -> Option<(String, SessionState)> {
        match event {
            HostEvent::SpawnResult { session_id, result } => {
                if result.is_err() {
                    self.sessions.write().await.remove(session_id);
                }
                None
            }
            HostEvent::Exit { session_id, .. } => {
                let mut sessions = self.sessions.write().await;
                if let Some(session) = sessions.get_mut(session_id) {
                    let _ = session.apply_transition(SessionState::Completed);
                }
                None
            }
            HostEvent::AgentState { session_id, next, .. } => {
                let mut sessions = self.sessions.write().await;
                if let Some(session) = sessions.get_mut(session_id) {
                    let _ = session.apply_transition(*next);
                }
                Some((session_id.clone(), *next))
            }
            HostEvent::TerminalTrashed { session_id } => {
                let mut sessions = self.sessions.write().await;
                if let Some(session) = sessions.get_mut(session_id) {
                    session.mark_trashed(0);
                }
                None
            }
            HostEvent::TerminalRestored { session_id } => {
                let mut sessions = self.sessions.write().await;
                if let Some(session) = sessions.get_mut(session_id) {
                    session.restore();
                }
                None
            }
            HostEvent::Data { session_id, .. } => {
                let mut sessions = self.sessions.write().await;
                if let Some(session) = sessions.get_mut(session_id) {
                    session.record_output();
                }
                None
            }
            _ => None,
        }
    }

    pub async fn set_activity_tier(&self, id: &str, tier: ActivityTier) {
        if let Some(session) = self.sessions.write().await.get_mut(id) {
            session.activity_tier = tier;
        }
    }
}

pub type SharedSessionRegistry = Arc<SessionRegistry>;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
