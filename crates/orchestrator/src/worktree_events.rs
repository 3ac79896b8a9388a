// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree lifecycle events published on the shared event bus, the
//! worktree-crate analogue of `basecamp_taskqueue::events::TaskEvent`. The
//! worktree crate itself stays free of any bus dependency — its `Monitor`
//! only returns a `CycleResult` — so this is where a poll cycle's outcome
//! becomes something subscribers can observe.

use basecamp_eventbus::Event;
use basecamp_worktree::WorktreeSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorktreeEventKind {
    Changed,
    BreakerTripped,
    Removed,
}

#[derive(Debug, Clone)]
pub enum WorktreeEvent {
    Changed { snapshot: WorktreeSnapshot },
    BreakerTripped { snapshot: WorktreeSnapshot },
    Removed { path: std::path::PathBuf },
}

impl Event for WorktreeEvent {
    type Kind = WorktreeEventKind;

    fn kind(&self) -> WorktreeEventKind {
        match self {
            Self::Changed { .. } => WorktreeEventKind::Changed,
            Self::BreakerTripped { .. } => WorktreeEventKind::BreakerTripped,
            Self::Removed { .. } => WorktreeEventKind::Removed,
        }
    }
}
