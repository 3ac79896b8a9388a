// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming policy: ring allocation per activity tier, and the
//! watermark-based backpressure that pauses/resumes reading from a child
//! when its ring fills up.

use basecamp_ring::RingBuffer;

use crate::session::ActivityTier;

/// Backpressure status derived from ring utilization against the
/// configured watermarks. Hysteresis between `watermark_low` and
/// `watermark_high` prevents rapid pause/resume flapping at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Flowing,
    Paused,
}

/// Per-session streaming policy: tracks the active ring (if any) and the
/// current flow state.
pub struct Streaming {
    tier: ActivityTier,
    ring: Option<RingBuffer>,
    ring_size: usize,
    flow: FlowState,
    watermark_high: u8,
    watermark_low: u8,
}

impl Streaming {
    pub fn new(tier: ActivityTier, ring_size: usize, watermark_high: u8, watermark_low: u8) -> Self {
        let ring = match tier {
            ActivityTier::Active => RingBuffer::new(ring_size).ok(),
            ActivityTier::Background => None,
        };
        Self { tier, ring, ring_size, flow: FlowState::Flowing, watermark_high, watermark_low }
    }

    pub fn tier(&self) -> ActivityTier {
        self.tier
    }

    pub fn flow_state(&self) -> FlowState {
        self.flow
    }

    pub fn ring(&self) -> Option<&RingBuffer> {
        self.ring.as_ref()
    }

    pub fn ring_mut(&mut self) -> Option<&mut RingBuffer> {
        self.ring.as_mut()
    }

    /// Move to `background`: deallocate the ring entirely. Subsequent
    /// output is only reflected in screen snapshots.
    pub fn set_background(&mut self) {
        self.tier = ActivityTier::Background;
        self.ring = None;
        self.flow = FlowState::Flowing;
    }

    /// Move to `active`, allocating a fresh ring for the session.
    pub fn set_active(&mut self) {
        self.tier = ActivityTier::Active;
        self.ring = RingBuffer::new(self.ring_size).ok();
        self.flow = FlowState::Flowing;
    }

    /// Poll interval for this tier, per the configured active/background
    /// defaults.
    pub fn poll_interval_ms(&self, active_ms: u64, background_ms: u64) -> u64 {
        match self.tier {
            ActivityTier::Active => active_ms,
            ActivityTier::Background => background_ms,
        }
    }

    /// Re-evaluate flow state against current ring utilization, returning
    /// `Some(new_state)` only when it changed (so callers emit a
    /// `terminal-status` event exactly once per crossing).
    pub fn observe_utilization(&mut self) -> Option<FlowState> {
        let util = self.ring.as_ref()?.utilization();
        let next = match self.flow {
            FlowState::Flowing if util >= self.watermark_high => Some(FlowState::Paused),
            FlowState::Paused if util <= self.watermark_low => Some(FlowState::Flowing),
            _ => None,
        };
        if let Some(next) = next {
            self.flow = next;
        }
        next
    }
}

#[cfg(test)]
#[path = "streaming_tests.rs"]
mod tests;
