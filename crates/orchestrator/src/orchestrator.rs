// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task Orchestrator: assigns queued tasks to available agent sessions
//! (spec.md §4.8). Single-flight assignment uses an `AtomicBool` swap
//! exactly like the teacher's retry-timer dedup in
//! `profile.rs::schedule_retry` — attempt the pass, and if one is already
//! running, no-op rather than block or queue a second pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use basecamp_ptyhost::protocol::Request as HostRequest;
use basecamp_taskqueue::{Task, TaskQueue};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::pty_client::PtyHostClient;
use crate::registry::SessionRegistry;
use crate::router::Router;

/// Drives task-to-session assignment against a shared queue and session
/// table. Owns none of the state itself — `System` wires the shared
/// `TaskQueue`/`SessionRegistry`/`PtyHostClient` in — so the same pass can
/// be triggered from a task-enqueued event, a session-became-idle event,
/// or a periodic sweep without any of them needing their own copy of the
/// assignment logic.
pub struct TaskOrchestrator {
    queue: Arc<Mutex<TaskQueue>>,
    sessions: Arc<SessionRegistry>,
    host: Arc<PtyHostClient>,
    router: Box<dyn Router>,
    assigning: AtomicBool,
}

impl TaskOrchestrator {
    pub fn new(
        queue: Arc<Mutex<TaskQueue>>,
        sessions: Arc<SessionRegistry>,
        host: Arc<PtyHostClient>,
        router: Box<dyn Router>,
    ) -> Self {
        Self { queue, sessions, host, router, assigning: AtomicBool::new(false) }
    }

    /// Attempt one assignment pass. Returns `false` without doing
    /// anything if a pass is already in flight; the caller that lost the
    /// race doesn't need to retry — the in-flight pass will itself loop
    /// until nothing more can be assigned (see [`Self::run_pass`]).
    pub async fn try_assign(&self) -> bool {
        if self.assigning.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.run_pass().await;
        self.assigning.store(false, Ordering::Release);
        true
    }

    /// Assign every queued task that has an available session, in
    /// dispatch order (`TaskQueue::dequeue_next`'s priority-desc /
    /// created-at ordering), stopping once a pass over the queue makes
    /// no progress.
    async fn run_pass(&self) {
        loop {
            let candidate = {
                let queue = self.queue.lock().await;
                queue.dequeue_next()
            };
            let Some(task) = candidate else { return };

            if !self.assign_one(&task).await {
                return;
            }
        }
    }

    /// Try to place a single task. Returns `true` if it was assigned (so
    /// the caller should keep looping), `false` if no session was
    /// available for it right now.
    async fn assign_one(&self, task: &Task) -> bool {
        let available = self.sessions.available_for_assignment(task.worktree_id.as_deref()).await;
        if available.is_empty() {
            return false;
        }

        let hints = task.routing_hints.clone().unwrap_or_default();
        let chosen_id = self
            .router
            .route(&hints, &available)
            .filter(|id| available.iter().any(|s| &s.id == id))
            .unwrap_or_else(|| available[0].id.clone());

        let run_id = Uuid::new_v4().to_string();
        {
            let mut queue = self.queue.lock().await;
            if queue.mark_running(&task.id, &chosen_id, &run_id).is_err() {
                // Lost a race against a concurrent cancel/cascade; leave
                // the session free and let the next pass re-evaluate.
                return true;
            }
        }

        let submitted = self
            .host
            .send(&HostRequest::Submit { session_id: chosen_id.clone(), line: task_payload(task) })
            .await;
        if submitted.is_err() {
            let mut queue = self.queue.lock().await;
            let _ = queue.mark_failed(&task.id, "failed to submit task to pty host: session disconnected");
        }

        true
    }

    /// Record a task outcome reported back from a session (driven by the
    /// controller's event loop reacting to `agent-state` transitions to a
    /// terminal state, not called directly by tests exercising only the
    /// assignment algorithm).
    pub async fn complete_task(&self, task_id: &str, payload: Option<serde_json::Value>) {
        let mut queue = self.queue.lock().await;
        let _ = queue.mark_completed(task_id, Some(basecamp_taskqueue::TaskResult::ok(payload)));
    }

    pub async fn fail_task(&self, task_id: &str, error: impl Into<String>) {
        let mut queue = self.queue.lock().await;
        let _ = queue.mark_failed(task_id, error);
    }

    /// Cancel every non-terminal task bound to a worktree that just
    /// disappeared (spec.md §9 worktree-removal handling).
    pub async fn cancel_tasks_for_worktree(&self, worktree_id: &str) {
        let mut queue = self.queue.lock().await;
        let ids: Vec<String> = queue
            .list_tasks(&basecamp_taskqueue::ListFilter::default())
            .into_iter()
            .filter(|t| t.worktree_id.as_deref() == Some(worktree_id) && !t.status.is_terminal())
            .map(|t| t.id)
            .collect();
        for id in ids {
            let _ = queue.cancel(&id);
        }
    }
}

/// The line submitted to the session's pty, carrying just enough of the
/// task for the agent to act on it. The full task record stays in the
/// queue; only the parts an agent needs to start work cross the wire.
fn task_payload(task: &Task) -> String {
    serde_json::json!({
        "task_id": task.id,
        "title": task.title,
        "description": task.description,
    })
    .to_string()
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
