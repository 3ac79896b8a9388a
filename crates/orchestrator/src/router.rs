// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external router a task's routing hints are handed to (spec.md
//! §4.8 step 3). Kept behind a trait so the orchestrator's assignment
//! algorithm is testable without a real capability-matching backend —
//! the same shape as `basecamp_worktree::VcsProbe` being injected so the
//! monitor doesn't need a live `git` to test against.

use basecamp_taskqueue::RoutingHints;

use crate::registry::SessionSummary;

/// Chooses a preferred session id for a task's routing hints. Returning
/// `None`, or a session id the caller's available set doesn't contain,
/// falls through to "pick the first available session" per spec.md.
pub trait Router: Send + Sync {
    fn route(&self, hints: &RoutingHints, available: &[SessionSummary]) -> Option<String>;
}

/// No-op router: always falls through to "first available". Used when no
/// routing backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRouter;

impl Router for NoopRouter {
    fn route(&self, _hints: &RoutingHints, _available: &[SessionSummary]) -> Option<String> {
        None
    }
}

/// Matches a task's `preferred_domains` against each candidate session's
/// `agent_type`, picking the first candidate whose agent type appears in
/// the preferred list. Ignores `required_capabilities`: this repo has no
/// capability registry to check them against, so that hint is carried on
/// the wire (spec.md §3) but only `preferred_domains` is actionable here.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreferredDomainRouter;

impl Router for PreferredDomainRouter {
    fn route(&self, hints: &RoutingHints, available: &[SessionSummary]) -> Option<String> {
        if hints.preferred_domains.is_empty() {
            return None;
        }
        available
            .iter()
            .find(|s| s.agent_type.as_deref().is_some_and(|t| hints.preferred_domains.iter().any(|d| d == t)))
            .map(|s| s.id.clone())
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
