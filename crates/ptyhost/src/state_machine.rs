// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state machine: infers `idle | working | waiting | completed |
//! failed` from heuristic output signals, gated by a per-trigger
//! confidence threshold.
//!
//! Multiple heuristic tiers can fire concurrently (a hook event, a
//! quiescence timer, a screen-content scan); [`CompositeDetector`]
//! resolves them the way the teacher's tiered detector does: a
//! same-or-stronger signal replaces the current state immediately, a
//! weaker one may only escalate state priority, never downgrade it, and
//! duplicate states are suppressed. Terminal states always win
//! immediately regardless of confidence, since there is nothing further
//! to wait for.

use serde::{Deserialize, Serialize};

/// Inferred semantic state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Working,
    Waiting,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Relative priority used to resolve concurrent detector tiers: a
    /// lower-confidence signal may escalate priority but never downgrade.
    fn priority(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Working => 1,
            Self::Waiting => 2,
            Self::Completed | Self::Failed => 3,
        }
    }
}

/// What caused a candidate state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    UserInput,
    OutputQuiescence,
    WaitingCue,
    Completion,
    Failure,
    Manual,
}

impl Trigger {
    /// Minimum confidence this trigger kind must exceed to be accepted.
    /// Not contractual — configurable per spec.md §9 Open Questions.
    pub fn default_threshold(&self) -> f64 {
        match self {
            Self::UserInput => 0.4,
            Self::OutputQuiescence => 0.6,
            Self::WaitingCue => 0.7,
            Self::Completion | Self::Failure => 0.8,
            Self::Manual => 0.0,
        }
    }
}

/// A candidate transition proposed by a detector tier.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub state: SessionState,
    pub trigger: Trigger,
    pub confidence: f64,
    pub cause: String,
}

/// An accepted transition, broadcast as an `agent-state` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub session_id: String,
    pub prev: SessionState,
    pub next: SessionState,
    pub timestamp_epoch_ms: u64,
    pub trigger: Trigger,
    pub confidence: f64,
    pub worktree_id: Option<String>,
}

/// Decide whether a candidate should become the session's next state.
///
/// `current_confidence` is the confidence of the signal that produced
/// `current`, needed to judge whether this candidate is "same-or-stronger"
/// per this module's header. Returns `None` when the candidate is
/// rejected (below its own trigger threshold, duplicate, a downgrade from
/// a weaker signal, or leaving a terminal state).
pub fn evaluate(current: SessionState, current_confidence: f64, candidate: &Candidate) -> Option<SessionState> {
    if current.is_terminal() {
        return None;
    }
    if candidate.state == current {
        return None;
    }

    // Terminal candidates are always accepted immediately: there is no
    // further state to wait for, and a confidence gate would only delay
    // a session that has already finished.
    if candidate.state.is_terminal() {
        return Some(candidate.state);
    }

    if candidate.confidence <= candidate.trigger.default_threshold() {
        return None;
    }

    // A same-or-stronger signal replaces the current state immediately,
    // even if that means a downgrade (e.g. working -> idle). A weaker
    // signal may only escalate priority (e.g. working -> waiting); it may
    // never downgrade the current state.
    if candidate.confidence >= current_confidence || candidate.state.priority() > current.priority() {
        return Some(candidate.state);
    }
    None
}

/// Combines multiple candidate streams into one accepted transition per
/// call, applying [`evaluate`] plus tier-style dedup/escalation so two
/// detectors firing for the same semantic moment don't double-transition.
/// Tracks the confidence of the currently accepted state alongside the
/// state itself, since `evaluate` needs it to judge same-or-stronger.
#[derive(Debug, Default)]
pub struct CompositeDetector {
    current: Option<(SessionState, f64)>,
}

impl CompositeDetector {
    /// A freshly constructed detector has no signal behind its initial
    /// state yet, so it is seeded at full confidence: only an equally
    /// confident (or stronger, or escalating) candidate can move it.
    pub fn new(initial: SessionState) -> Self {
        Self { current: Some((initial, 1.0)) }
    }

    pub fn current(&self) -> SessionState {
        self.current.map(|(state, _)| state).unwrap_or(SessionState::Idle)
    }

    /// Feed one candidate; returns `Some(next)` if it is accepted.
    pub fn feed(&mut self, candidate: &Candidate) -> Option<SessionState> {
        let (current, confidence) = self.current.unwrap_or((SessionState::Idle, 1.0));
        let next = evaluate(current, confidence, candidate)?;
        self.current = Some((next, candidate.confidence));
        Some(next)
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
