// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL persistence for the task store.
//!
//! Every mutation appends the task's full current state as one line.
//! `load` replays the file, keeps only the latest record per task id,
//! demotes anything still `running` back to `queued` (the process that
//! was running it is gone), and rewrites the file compacted to that
//! final state.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::task::{Task, TaskStatus};

/// File-backed append-only store for [`crate::TaskQueue`] state.
pub struct JsonlTaskStore {
    path: PathBuf,
}

impl JsonlTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one task's current state as a JSONL line.
    pub fn append(&self, task: &Task) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(task)?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())
    }

    /// Replay the log, keep the latest record per task id (in original
    /// first-seen order), and demote any task still `running` to
    /// `queued`. Returns an empty vec if the file does not exist yet.
    pub fn load(&self) -> std::io::Result<Vec<Task>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut order: Vec<String> = Vec::new();
        let mut latest: std::collections::HashMap<String, Task> = std::collections::HashMap::new();
        for line in contents.lines() {
            let Ok(task) = serde_json::from_str::<Task>(line) else { continue };
            if !latest.contains_key(&task.id) {
                order.push(task.id.clone());
            }
            latest.insert(task.id.clone(), task);
        }

        let tasks: Vec<Task> = order
            .into_iter()
            .filter_map(|id| latest.remove(&id))
            .map(|mut task| {
                if task.status == TaskStatus::Running {
                    task.status = TaskStatus::Queued;
                    task.assigned_session_id = None;
                    task.run_id = None;
                    task.started_at_epoch_ms = None;
                }
                task
            })
            .collect();

        self.compact(&tasks)?;
        Ok(tasks)
    }

    /// Rewrite the file to hold exactly one line per task, its current
    /// state, discarding superseded history.
    pub fn compact(&self, tasks: &[Task]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut body = String::new();
        for task in tasks {
            body.push_str(&serde_json::to_string(task)?);
            body.push('\n');
        }
        std::fs::write(&self.path, body)
    }

    /// Truncate the log to empty.
    pub fn clear(&self) -> std::io::Result<()> {
        std::fs::write(&self.path, "")
    }
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
