// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dependency-ordered task store: cycle-checked mutation, priority
//! dispatch, and cascading failure/cancellation through the reverse
//! dependency index.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use basecamp_eventbus::EventBus;

use crate::error::TaskQueueError;
use crate::events::TaskEvent;
use crate::persist::JsonlTaskStore;
use crate::task::{Task, TaskResult, TaskSpec, TaskStatus};

fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Sort key for [`TaskQueue::list_tasks`]. Defaults to priority descending,
/// per spec; `created_at` is available in either direction for UIs that
/// want chronological order instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    PriorityDesc,
    CreatedAtAsc,
    CreatedAtDesc,
}

/// Status filter and ordering for [`TaskQueue::list_tasks`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub statuses: Option<BTreeSet<TaskStatus>>,
    pub worktree_id: Option<String>,
    pub limit: Option<usize>,
    pub order: SortOrder,
}

/// Point-in-time counts by status, for admin/CLI reporting.
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub total: usize,
    pub by_status: HashMap<TaskStatus, usize>,
}

/// A DAG-structured task store.
///
/// Every mutation that changes a task's status or dependency set runs
/// through one of the methods here; none of them hand out a `&mut Task`,
/// so the dependency/dependents invariant (each edge recorded on both
/// ends) and the status machine stay internally consistent.
pub struct TaskQueue {
    tasks: HashMap<String, Task>,
    events: Option<EventBus<TaskEvent>>,
    store: Option<JsonlTaskStore>,
    sequence: AtomicU64,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self { tasks: HashMap::new(), events: None, store: None, sequence: AtomicU64::new(0) }
    }

    /// Build a queue that publishes lifecycle transitions on `events`.
    pub fn with_event_bus(events: EventBus<TaskEvent>) -> Self {
        Self { tasks: HashMap::new(), events: Some(events), store: None, sequence: AtomicU64::new(0) }
    }

    /// Load persisted state from `store` (demoting any `running` task to
    /// `queued`, per restart semantics) and attach `store` so future
    /// mutations are appended to it.
    pub fn load(store: JsonlTaskStore, events: Option<EventBus<TaskEvent>>) -> std::io::Result<Self> {
        let mut queue = Self { tasks: HashMap::new(), events, store: None, sequence: AtomicU64::new(0) };
        for task in store.load()? {
            queue.restore(task);
        }
        queue.store = Some(store);
        Ok(queue)
    }

    pub fn event_bus(&self) -> Option<&EventBus<TaskEvent>> {
        self.events.as_ref()
    }

    fn publish(&self, event: TaskEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }

    /// Append the current state of `task_id` to the attached store, if
    /// any. Persistence failures are logged, not propagated: an
    /// in-memory mutation has already committed by the time this runs,
    /// so there is nothing left to roll back.
    fn persist(&self, task_id: &str) {
        let Some(store) = &self.store else { return };
        let Some(task) = self.tasks.get(task_id) else { return };
        if let Err(err) = store.append(task) {
            tracing::warn!(task_id, error = %err, "failed to persist task state");
        }
    }

    fn is_satisfied(&self, dependency_id: &str) -> bool {
        self.tasks.get(dependency_id).is_some_and(|t| t.status == TaskStatus::Completed)
    }

    fn unmet_dependencies(&self, task: &Task) -> BTreeSet<String> {
        task.blocked_by(|d| self.is_satisfied(d)).into_iter().map(str::to_owned).collect()
    }

    /// Whether `candidate` is reachable from `start` by following
    /// `dependencies` edges (i.e. `start` transitively depends on
    /// `candidate`, directly or through intermediate tasks).
    fn depends_transitively_on(&self, start: &str, candidate: &str) -> bool {
        let mut stack = vec![start.to_owned()];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == candidate {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(task) = self.tasks.get(&current) {
                stack.extend(task.dependencies.iter().cloned());
            }
        }
        false
    }

    /// Create a task in `draft` status. Dependencies must already exist;
    /// a brand-new task can never be part of an existing cycle since
    /// nothing can yet depend on it.
    pub fn create_task(&mut self, spec: TaskSpec) -> Result<Task, TaskQueueError> {
        if self.tasks.contains_key(&spec.id) {
            return Err(TaskQueueError::InvalidState {
                id: spec.id,
                status: "exists",
                op: "create_task",
            });
        }
        for dep in &spec.dependencies {
            if !self.tasks.contains_key(dep) {
                return Err(TaskQueueError::DependencyMissing(dep.clone()));
            }
        }

        let id = spec.id.clone();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let task = Task::new(spec, now_epoch_ms(), sequence);
        for dep in &task.dependencies {
            if let Some(dep_task) = self.tasks.get_mut(dep) {
                dep_task.dependents.insert(id.clone());
            }
        }
        let snapshot = task.clone();
        self.tasks.insert(id.clone(), task);
        self.persist(&id);
        Ok(snapshot)
    }

    /// Record that `task_id` depends on `dependency_id`. Self-loops and
    /// any edge that would close a cycle are rejected without mutating
    /// the graph.
    pub fn add_dependency(&mut self, task_id: &str, dependency_id: &str) -> Result<(), TaskQueueError> {
        if task_id == dependency_id {
            return Err(TaskQueueError::CycleDetected {
                task: task_id.to_owned(),
                dependency: dependency_id.to_owned(),
            });
        }
        if !self.tasks.contains_key(task_id) {
            return Err(TaskQueueError::NotFound(task_id.to_owned()));
        }
        if !self.tasks.contains_key(dependency_id) {
            return Err(TaskQueueError::DependencyMissing(dependency_id.to_owned()));
        }
        // dependency_id already transitively requiring task_id to finish
        // first means the new edge would close a cycle.
        if self.depends_transitively_on(dependency_id, task_id) {
            return Err(TaskQueueError::CycleDetected {
                task: task_id.to_owned(),
                dependency: dependency_id.to_owned(),
            });
        }

        let dependency_satisfied = self.is_satisfied(dependency_id);
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.dependencies.insert(dependency_id.to_owned());
            if task.status == TaskStatus::Queued && !dependency_satisfied {
                task.status = TaskStatus::Blocked;
            }
        }
        if let Some(dep_task) = self.tasks.get_mut(dependency_id) {
            dep_task.dependents.insert(task_id.to_owned());
        }
        self.persist(task_id);
        self.persist(dependency_id);
        Ok(())
    }

    /// Remove a dependency edge. If `task_id` was blocked solely on
    /// `dependency_id` (or already-satisfied others), it returns to
    /// `queued`.
    pub fn remove_dependency(&mut self, task_id: &str, dependency_id: &str) -> Result<(), TaskQueueError> {
        if !self.tasks.contains_key(task_id) {
            return Err(TaskQueueError::NotFound(task_id.to_owned()));
        }
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.dependencies.remove(dependency_id);
        }
        if let Some(dep_task) = self.tasks.get_mut(dependency_id) {
            dep_task.dependents.remove(task_id);
        }

        let now = now_epoch_ms();
        let should_unblock =
            self.tasks.get(task_id).is_some_and(|t| t.status == TaskStatus::Blocked && self.unmet_dependencies(t).is_empty());
        if should_unblock {
            if let Some(task) = self.tasks.get_mut(task_id) {
                task.status = TaskStatus::Queued;
                task.queued_at_epoch_ms.get_or_insert(now);
            }
            self.publish(TaskEvent::Enqueued { task_id: task_id.to_owned() });
        }
        self.persist(task_id);
        Ok(())
    }

    /// Move a `draft` task into `queued` (or `blocked` if unmet
    /// dependencies remain).
    pub fn enqueue(&mut self, task_id: &str) -> Result<(), TaskQueueError> {
        let (status, unmet) = {
            let task = self.tasks.get(task_id).ok_or_else(|| TaskQueueError::NotFound(task_id.to_owned()))?;
            (task.status, self.unmet_dependencies(task))
        };
        if status != TaskStatus::Draft {
            return Err(TaskQueueError::InvalidState {
                id: task_id.to_owned(),
                status: status_label(status),
                op: "enqueue",
            });
        }

        let now = now_epoch_ms();
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.queued_at_epoch_ms = Some(now);
            task.status = if unmet.is_empty() { TaskStatus::Queued } else { TaskStatus::Blocked };
        }
        if unmet.is_empty() {
            self.publish(TaskEvent::Enqueued { task_id: task_id.to_owned() });
        }
        self.persist(task_id);
        Ok(())
    }

    /// Highest-priority queued task, oldest first on a priority tie.
    /// Does not mutate status; callers pair this with [`Self::mark_running`].
    pub fn dequeue_next(&self) -> Option<Task> {
        self.tasks
            .values()
            .filter(|t| t.status == TaskStatus::Queued)
            .max_by(|a, b| a.priority.cmp(&b.priority).then(b.sequence.cmp(&a.sequence)))
            .cloned()
    }

    /// Transition a queued task to `running`, binding it to the session
    /// and run that will execute it.
    pub fn mark_running(&mut self, task_id: &str, session_id: &str, run_id: &str) -> Result<(), TaskQueueError> {
        let status = self.tasks.get(task_id).ok_or_else(|| TaskQueueError::NotFound(task_id.to_owned()))?.status;
        if status != TaskStatus::Queued {
            return Err(TaskQueueError::InvalidState {
                id: task_id.to_owned(),
                status: status_label(status),
                op: "mark_running",
            });
        }

        let now = now_epoch_ms();
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.status = TaskStatus::Running;
            task.assigned_session_id = Some(session_id.to_owned());
            task.run_id = Some(run_id.to_owned());
            task.started_at_epoch_ms = Some(now);
        }
        self.publish(TaskEvent::Assigned {
            task_id: task_id.to_owned(),
            session_id: session_id.to_owned(),
            run_id: run_id.to_owned(),
        });
        self.persist(task_id);
        Ok(())
    }

    /// Complete a running task, unblocking any dependent whose other
    /// dependencies are already satisfied.
    pub fn mark_completed(&mut self, task_id: &str, result: Option<TaskResult>) -> Result<(), TaskQueueError> {
        let (status, dependents) = {
            let task = self.tasks.get(task_id).ok_or_else(|| TaskQueueError::NotFound(task_id.to_owned()))?;
            (task.status, task.dependents.iter().cloned().collect::<Vec<_>>())
        };
        if status != TaskStatus::Running {
            return Err(TaskQueueError::InvalidState {
                id: task_id.to_owned(),
                status: status_label(status),
                op: "mark_completed",
            });
        }

        let now = now_epoch_ms();
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.status = TaskStatus::Completed;
            task.completed_at_epoch_ms = Some(now);
            task.result = result;
        }
        self.publish(TaskEvent::Completed { task_id: task_id.to_owned() });
        self.persist(task_id);

        for dependent_id in dependents {
            let should_unblock = self
                .tasks
                .get(&dependent_id)
                .is_some_and(|d| d.status == TaskStatus::Blocked && self.unmet_dependencies(d).is_empty());
            if !should_unblock {
                continue;
            }
            if let Some(dependent) = self.tasks.get_mut(&dependent_id) {
                dependent.status = TaskStatus::Queued;
                dependent.queued_at_epoch_ms.get_or_insert(now);
            }
            self.publish(TaskEvent::Enqueued { task_id: dependent_id.clone() });
            self.persist(&dependent_id);
        }
        Ok(())
    }

    /// Fail a running task, cascading failure to every direct and
    /// transitive dependent still in a non-terminal state.
    pub fn mark_failed(&mut self, task_id: &str, error: impl Into<String>) -> Result<(), TaskQueueError> {
        let status = self.tasks.get(task_id).ok_or_else(|| TaskQueueError::NotFound(task_id.to_owned()))?.status;
        if status != TaskStatus::Running {
            return Err(TaskQueueError::InvalidState {
                id: task_id.to_owned(),
                status: status_label(status),
                op: "mark_failed",
            });
        }

        let error = error.into();
        let now = now_epoch_ms();
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.status = TaskStatus::Failed;
            task.completed_at_epoch_ms = Some(now);
            task.result = Some(TaskResult::error(error.clone()));
        }
        self.publish(TaskEvent::Failed { task_id: task_id.to_owned(), error: error.clone() });
        self.persist(task_id);

        let message = format!("Upstream failure: task {task_id} failed: {error}");
        self.cascade_terminal(task_id, TaskStatus::Failed, &message);
        Ok(())
    }

    /// Cancel a task. Legal from any non-terminal state; a running task
    /// is signalled externally by the caller but still lands in
    /// `cancelled` here. Cascades to dependents like failure.
    pub fn cancel(&mut self, task_id: &str) -> Result<(), TaskQueueError> {
        let status = self.tasks.get(task_id).ok_or_else(|| TaskQueueError::NotFound(task_id.to_owned()))?.status;
        if status.is_terminal() {
            return Err(TaskQueueError::InvalidState {
                id: task_id.to_owned(),
                status: status_label(status),
                op: "cancel",
            });
        }

        let now = now_epoch_ms();
        if let Some(task) = self.tasks.get_mut(task_id) {
            task.status = TaskStatus::Cancelled;
            task.completed_at_epoch_ms = Some(now);
            task.result.get_or_insert_with(|| TaskResult::error("cancelled"));
        }
        self.publish(TaskEvent::Cancelled { task_id: task_id.to_owned() });
        self.persist(task_id);

        let message = format!("Upstream cancellation: task {task_id} was cancelled");
        self.cascade_terminal(task_id, TaskStatus::Cancelled, &message);
        Ok(())
    }

    /// BFS over the reverse dependency index, terminating every
    /// non-terminal transitive dependent of `root` with `status`.
    fn cascade_terminal(&mut self, root: &str, status: TaskStatus, message: &str) {
        let mut queue: Vec<String> =
            self.tasks.get(root).map(|t| t.dependents.iter().cloned().collect()).unwrap_or_default();
        let mut visited = HashSet::new();
        let now = now_epoch_ms();

        while let Some(id) = queue.pop() {
            if !visited.insert(id.clone()) {
                continue;
            }
            let next = self.tasks.get(&id).and_then(|t| {
                (!t.status.is_terminal()).then(|| t.dependents.iter().cloned().collect::<Vec<_>>())
            });
            let Some(next) = next else { continue };

            if let Some(task) = self.tasks.get_mut(&id) {
                task.status = status;
                task.completed_at_epoch_ms = Some(now);
                task.result = Some(TaskResult::error(message.to_owned()));
            }
            let event = match status {
                TaskStatus::Failed => TaskEvent::Failed { task_id: id.clone(), error: message.to_owned() },
                _ => TaskEvent::Cancelled { task_id: id.clone() },
            };
            self.publish(event);
            self.persist(&id);
            queue.extend(next);
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    pub fn list_tasks(&self, filter: &ListFilter) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| filter.statuses.as_ref().is_none_or(|s| s.contains(&t.status)))
            .filter(|t| filter.worktree_id.is_none() || t.worktree_id.as_deref() == filter.worktree_id.as_deref())
            .cloned()
            .collect();
        match filter.order {
            SortOrder::PriorityDesc => {
                tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.sequence.cmp(&b.sequence)))
            }
            SortOrder::CreatedAtAsc => tasks
                .sort_by(|a, b| a.created_at_epoch_ms.cmp(&b.created_at_epoch_ms).then(a.sequence.cmp(&b.sequence))),
            SortOrder::CreatedAtDesc => tasks
                .sort_by(|a, b| b.created_at_epoch_ms.cmp(&a.created_at_epoch_ms).then(b.sequence.cmp(&a.sequence))),
        }
        if let Some(limit) = filter.limit {
            tasks.truncate(limit);
        }
        tasks
    }

    pub fn get_blocked_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.values().filter(|t| t.status == TaskStatus::Blocked).cloned().collect();
        tasks.sort_by(|a, b| a.sequence.cmp(&b.sequence));
        tasks
    }

    pub fn get_stats(&self) -> QueueStats {
        let mut by_status = HashMap::new();
        for task in self.tasks.values() {
            *by_status.entry(task.status).or_insert(0) += 1;
        }
        QueueStats { total: self.tasks.len(), by_status }
    }

    /// Drop every task, including any attached persisted log.
    pub fn clear(&mut self) {
        self.tasks.clear();
        if let Some(store) = &self.store {
            if let Err(err) = store.clear() {
                tracing::warn!(error = %err, "failed to clear persisted task log");
            }
        }
    }

    pub(crate) fn restore(&mut self, task: Task) {
        self.sequence.fetch_max(task.sequence + 1, Ordering::Relaxed);
        self.tasks.insert(task.id.clone(), task);
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Draft => "draft",
        TaskStatus::Queued => "queued",
        TaskStatus::Blocked => "blocked",
        TaskStatus::Running => "running",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
