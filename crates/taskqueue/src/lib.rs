// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG-structured task queue: dependency/cycle checking, priority
//! dispatch, cascading failure/cancellation, and JSONL persistence.

pub mod error;
pub mod events;
pub mod persist;
pub mod queue;
pub mod task;

pub use error::TaskQueueError;
pub use events::{TaskEvent, TaskEventKind};
pub use persist::JsonlTaskStore;
pub use queue::{ListFilter, QueueStats, SortOrder, TaskQueue};
pub use task::{RoutingHints, Task, TaskResult, TaskSpec, TaskStatus};
