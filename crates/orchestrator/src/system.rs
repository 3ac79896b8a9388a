// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root wiring for the controller: one `System` per running
//! `basecamp` process, composed in a fixed init order — store, event
//! bus, task queue, PTY Host client, worktree monitors, orchestrator —
//! so each later stage can assume the earlier ones are already live.
//! Exposes the Controller API the admin CLI drives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use basecamp_eventbus::EventBus;
use basecamp_ptyhost::protocol::{Event as HostEvent, Request as HostRequest};
use basecamp_ptyhost::session::{Session, SpawnParams};
use basecamp_taskqueue::{JsonlTaskStore, ListFilter, Task, TaskEvent, TaskQueue, TaskSpec};
use basecamp_worktree::MonitorConfig;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::orchestrator::TaskOrchestrator;
use crate::pty_client::PtyHostClient;
use crate::registry::SessionRegistry;
use crate::router::{NoopRouter, Router};
use crate::worktree_events::WorktreeEvent;
use crate::worktrees::{self, WorktreeRegistry};

/// Everything one running controller owns. `Arc`-wrapped fields are
/// shared with the background tasks `spawn` starts (the host-event pump,
/// the assignment trigger); the rest only ever sees `&self`.
pub struct System {
    config: ControllerConfig,
    queue: Arc<Mutex<TaskQueue>>,
    worktree_events: Arc<EventBus<WorktreeEvent>>,
    sessions: Arc<SessionRegistry>,
    host: Arc<PtyHostClient>,
    worktrees: Arc<WorktreeRegistry>,
    orchestrator: Arc<TaskOrchestrator>,
}

impl System {
    /// Build and start a `System`: spawn the PTY Host child process,
    /// begin pumping its events into the session table, and wire the
    /// orchestrator to react to task-enqueued and session-state events.
    /// `router` lets an embedder supply a real capability-matching
    /// backend; pass [`NoopRouter`] for "first available session wins".
    pub async fn start(config: ControllerConfig, router: Box<dyn Router>) -> Result<Self, ControllerError> {
        config.validate().map_err(|e| ControllerError::new(crate::error::ErrorKind::IoError, e))?;

        let store = JsonlTaskStore::new(config.task_store_path());
        let queue = TaskQueue::load(store, Some(EventBus::new()))
            .map_err(|e| ControllerError::new(crate::error::ErrorKind::IoError, e.to_string()))?;
        let queue = Arc::new(Mutex::new(queue));

        let worktree_events = Arc::new(EventBus::new());

        let host = Arc::new(
            PtyHostClient::spawn(&config.ptyhost_bin, std::iter::empty())
                .await
                .map_err(|e| ControllerError::new(crate::error::ErrorKind::SpawnFailed, e.to_string()))?,
        );

        let sessions = Arc::new(SessionRegistry::new());
        let worktrees = Arc::new(WorktreeRegistry::new());
        let orchestrator = Arc::new(TaskOrchestrator::new(queue.clone(), sessions.clone(), host.clone(), router));

        let system = Self { config, queue, worktree_events, sessions, host, worktrees, orchestrator };
        system.spawn_host_event_pump();
        Ok(system)
    }

    /// Pump the PTY Host's event stream into the session table, and
    /// trigger an assignment pass whenever a session frees up or
    /// completes/fails a task it was running.
    fn spawn_host_event_pump(&self) {
        let mut events = self.host.subscribe();
        let sessions = self.sessions.clone();
        let orchestrator = self.orchestrator.clone();
        let queue = self.queue.clone();

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                };

                let transitioned = sessions.apply_host_event(&event).await;

                if let HostEvent::Exit { session_id, code, .. } = &event {
                    let running_task = {
                        let queue = queue.lock().await;
                        queue
                            .list_tasks(&ListFilter::default())
                            .into_iter()
                            .find(|t| t.assigned_session_id.as_deref() == Some(session_id.as_str()))
                            .map(|t| t.id)
                    };
                    if let Some(task_id) = running_task {
                        if code == &Some(0) {
                            orchestrator.complete_task(&task_id, None).await;
                        } else {
                            orchestrator.fail_task(&task_id, format!("session {session_id} exited with {code:?}")).await;
                        }
                    }
                }

                if transitioned.is_some() {
                    orchestrator.try_assign().await;
                }
            }
        });
    }

    // --- Task Orchestrator surface ---

    pub async fn create_task(&self, spec: TaskSpec) -> Result<Task, ControllerError> {
        let task = self.queue.lock().await.create_task(spec)?;
        Ok(task)
    }

    pub async fn enqueue_task(&self, task_id: &str) -> Result<(), ControllerError> {
        self.queue.lock().await.enqueue(task_id)?;
        self.orchestrator.try_assign().await;
        Ok(())
    }

    pub async fn list_tasks(&self, filter: &ListFilter) -> Vec<Task> {
        self.queue.lock().await.list_tasks(filter)
    }

    pub async fn get_task(&self, task_id: &str) -> Option<Task> {
        self.queue.lock().await.get(task_id).cloned()
    }

    pub async fn cancel_task(&self, task_id: &str) -> Result<(), ControllerError> {
        self.queue.lock().await.cancel(task_id)?;
        Ok(())
    }

    // --- Session surface ---

    pub async fn spawn_session(&self, params: SpawnParams) -> Result<String, ControllerError> {
        let id = Uuid::new_v4().to_string();
        self.host
            .send(&HostRequest::Spawn { session_id: id.clone(), params: params.clone() })
            .await
            .map_err(|e| ControllerError::new(crate::error::ErrorKind::Disconnected, e.to_string()))?;
        self.sessions.record_spawn_request(id.clone(), params).await;
        Ok(id)
    }

    pub async fn list_sessions(&self) -> Vec<Session> {
        self.sessions.list().await
    }

    pub async fn get_session(&self, session_id: &str) -> Option<Session> {
        self.sessions.get(session_id).await
    }

    pub async fn get_snapshot(&self, session_id: &str) -> Result<(), ControllerError> {
        self.host
            .send(&HostRequest::GetSnapshot { session_id: session_id.to_owned() })
            .await
            .map_err(|e| ControllerError::new(crate::error::ErrorKind::Disconnected, e.to_string()))
    }

    // --- Worktree surface ---

    pub async fn watch_worktree(&self, path: PathBuf) {
        let config = MonitorConfig {
            base_interval: std::time::Duration::from_millis(self.config.worktree_base_interval_ms),
            max_interval: std::time::Duration::from_millis(self.config.worktree_max_interval_ms),
            adaptive_backoff: true,
            ai_buffer_delay: std::time::Duration::from_millis(self.config.ai_buffer_delay_ms),
            breaker_threshold: self.config.breaker_threshold,
        };
        self.worktrees.watch(path, config, self.worktree_events.clone()).await;
    }

    pub async fn unwatch_worktree(&self, path: &Path, worktree_id: &str) {
        self.worktrees.unwatch(path).await;
        self.orchestrator.cancel_tasks_for_worktree(worktree_id).await;
    }

    /// Entry point for `basecamp worktree reset-breaker <path>`: drops a
    /// request the monitor's own poll loop clears on its next wakeup,
    /// since the CLI invocation and the running controller are separate
    /// processes with no shared memory (see `worktrees::request_breaker_reset`).
    pub fn request_breaker_reset(path: &Path) -> std::io::Result<()> {
        worktrees::request_breaker_reset(path)
    }

    /// Subscribe to task lifecycle events. Takes the queue lock briefly
    /// since the bus lives inside the `TaskQueue`, not alongside it — the
    /// same reason `TaskQueue::event_bus` returns `Option`: a queue built
    /// with `TaskQueue::new()` (tests, embedders that don't care) has none.
    pub async fn subscribe_task_events(
        &self,
        kind: basecamp_taskqueue::TaskEventKind,
        callback: impl Fn(&basecamp_eventbus::Envelope<TaskEvent>) + Send + Sync + 'static,
    ) -> Option<basecamp_eventbus::SubscriptionId> {
        self.queue.lock().await.event_bus().map(|bus| bus.subscribe(kind, callback))
    }

    pub fn worktree_event_bus(&self) -> &EventBus<WorktreeEvent> {
        &self.worktree_events
    }

    pub async fn dispose(&self) -> Result<(), ControllerError> {
        self.host.dispose().await.map_err(|e| ControllerError::new(crate::error::ErrorKind::Disconnected, e.to_string()))
    }
}

/// Convenience constructor using the default router (first-available
/// session wins); named so call sites read as what they mean rather than
/// `System::start(cfg, Box::new(NoopRouter))`.
pub async fn start_default(config: ControllerConfig) -> Result<System, ControllerError> {
    System::start(config, Box::new(NoopRouter)).await
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
