// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-producer/single-consumer byte ring over a fixed-capacity region.
//!
//! The region layout matches what a real deployment maps from shared
//! memory: a 32-byte header (capacity, write index, read index, signal
//! counter, producer epoch, reserved) followed by the data bytes. Tests and
//! in-process embedding use a heap-allocated region; a real PTY Host would
//! back the same layout with a named shared-memory segment handle passed
//! over the control channel.

use std::sync::atomic::{AtomicU32, Ordering};

/// Byte size of the ring header. Four `u32` fields plus 12 reserved bytes.
pub const HEADER_LEN: usize = 32;

/// Error returned when constructing or misusing a [`RingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// Capacity was not a power of two.
    CapacityNotPowerOfTwo,
    /// `read_up_to` was called with `max == 0`.
    ZeroMaxRead,
}

impl std::fmt::Display for RingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityNotPowerOfTwo => write!(f, "ring capacity must be a power of two"),
            Self::ZeroMaxRead => write!(f, "read_up_to requires max > 0"),
        }
    }
}

impl std::error::Error for RingError {}

/// Fixed-capacity SPSC byte ring.
///
/// Invariant: `(write - read) mod capacity <= capacity`. The producer
/// advances `write` only after bytes are fully copied into the data
/// region; the consumer advances `read` only after bytes are fully copied
/// out. `write` carries release semantics on publish and is loaded with
/// acquire semantics by the consumer, so bytes observed through `write`
/// are always fully visible. `signal` is bumped after every producer write
/// so consumers blocked on a futex/condvar equivalent can tell whether new
/// data has arrived since their last observation.
pub struct RingBuffer {
    capacity: usize,
    mask: usize,
    data: Vec<u8>,
    write: AtomicU32,
    read: AtomicU32,
    signal: AtomicU32,
    epoch: AtomicU32,
}

impl RingBuffer {
    /// Create a new ring with the given power-of-two capacity.
    pub fn new(capacity: usize) -> Result<Self, RingError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(RingError::CapacityNotPowerOfTwo);
        }
        Ok(Self {
            capacity,
            mask: capacity - 1,
            data: vec![0u8; capacity],
            write: AtomicU32::new(0),
            read: AtomicU32::new(0),
            signal: AtomicU32::new(0),
            epoch: AtomicU32::new(0),
        })
    }

    /// Total capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn write_pos(&self) -> u32 {
        self.write.load(Ordering::Acquire)
    }

    fn read_pos(&self) -> u32 {
        self.read.load(Ordering::Acquire)
    }

    /// Bytes currently queued (written but not yet read).
    pub fn len(&self) -> usize {
        (self.write_pos().wrapping_sub(self.read_pos())) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Percent full, for flow-control hysteresis (0..=100).
    pub fn utilization(&self) -> u8 {
        let len = self.len().min(self.capacity);
        ((len as u64 * 100) / self.capacity as u64) as u8
    }

    /// Write `bytes` to the ring. Returns the number of bytes written:
    /// either `bytes.len()` or `0`. Never partial — if free space is
    /// insufficient, nothing is written and the caller decides whether to
    /// wait or drop.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let free = self.capacity - self.len();
        if bytes.len() > free {
            return 0;
        }
        if bytes.is_empty() {
            return 0;
        }

        let start = (self.write_pos() as usize) & self.mask;
        let end = start + bytes.len();
        if end <= self.capacity {
            self.data[start..end].copy_from_slice(bytes);
        } else {
            let first = self.capacity - start;
            self.data[start..self.capacity].copy_from_slice(&bytes[..first]);
            self.data[..bytes.len() - first].copy_from_slice(&bytes[first..]);
        }

        // Publish with release: the copy above must be visible before any
        // reader observes the new write index.
        self.write
            .store(self.write_pos().wrapping_add(bytes.len() as u32), Ordering::Release);
        self.signal.fetch_add(1, Ordering::Release);
        bytes.len()
    }

    /// Read all currently available bytes as one contiguous, owned buffer
    /// (copying across the wrap point if needed). Advances `read` past the
    /// returned bytes.
    pub fn read(&mut self) -> Vec<u8> {
        let available = self.len();
        self.read_up_to(available.max(1)).unwrap_or_default()
    }

    /// Read up to `max` bytes, preserving any remainder for the next call.
    /// `max` must be greater than zero.
    pub fn read_up_to(&mut self, max: usize) -> Result<Vec<u8>, RingError> {
        if max == 0 {
            return Err(RingError::ZeroMaxRead);
        }

        // Acquire: we must see all bytes the producer published before
        // this write index.
        let write_pos = self.write.load(Ordering::Acquire);
        let read_pos = self.read_pos();
        let available = (write_pos.wrapping_sub(read_pos)) as usize;
        let n = available.min(max);
        if n == 0 {
            return Ok(Vec::new());
        }

        let start = (read_pos as usize) & self.mask;
        let mut out = Vec::with_capacity(n);
        let end = start + n;
        if end <= self.capacity {
            out.extend_from_slice(&self.data[start..end]);
        } else {
            let first = self.capacity - start;
            out.extend_from_slice(&self.data[start..self.capacity]);
            out.extend_from_slice(&self.data[..n - first]);
        }

        self.read.store(read_pos.wrapping_add(n as u32), Ordering::Release);
        Ok(out)
    }

    /// Value of the signal counter. A caller that observed `0` last time
    /// and sees the same value again knows no new data has arrived.
    pub fn signal(&self) -> u32 {
        self.signal.load(Ordering::Acquire)
    }

    /// Producer epoch, bumped whenever the ring is reset/reclaimed (e.g.
    /// a session moves from `background` back to `active` and rebuilds
    /// its ring). Consumers can use this to detect a reset under them.
    pub fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Reset the ring to empty and bump the epoch. Used when reclaiming a
    /// ring for a backgrounded session or rebuilding after `wake-terminal`.
    pub fn reset(&mut self) {
        self.write.store(0, Ordering::Release);
        self.read.store(0, Ordering::Release);
        self.signal.store(0, Ordering::Release);
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
#[path = "shared_ring_tests.rs"]
mod tests;
