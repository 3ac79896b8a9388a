// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overwrite-style scrollback buffer for `background`-tier sessions (no
//! SPSC ring is allocated for them) and for `replay-history` on any
//! session. Unlike [`basecamp_ring::RingBuffer`] this always accepts
//! writes, silently discarding the oldest bytes on overflow.

/// Fixed-capacity circular byte buffer for raw PTY output.
///
/// Tracks the total number of bytes ever written so consumers can request
/// replay from a global byte offset. When the buffer wraps, older data is
/// silently discarded.
#[derive(Debug)]
pub struct Scrollback {
    buf: Vec<u8>,
    capacity: usize,
    write_pos: usize,
    total_written: u64,
}

impl Scrollback {
    pub fn new(capacity: usize) -> Self {
        Self { buf: vec![0u8; capacity.max(1)], capacity: capacity.max(1), write_pos: 0, total_written: 0 }
    }

    pub fn write(&mut self, data: &[u8]) {
        for chunk in data.chunks(self.capacity) {
            let start = self.write_pos;
            let end = start + chunk.len();

            if end <= self.capacity {
                self.buf[start..end].copy_from_slice(chunk);
            } else {
                let first = self.capacity - start;
                self.buf[start..self.capacity].copy_from_slice(&chunk[..first]);
                self.buf[..chunk.len() - first].copy_from_slice(&chunk[first..]);
            }

            self.write_pos = end % self.capacity;
            self.total_written += chunk.len() as u64;
        }
    }

    /// Read bytes starting from the given global byte offset. Returns
    /// `None` if the offset has already been overwritten or is beyond the
    /// current write position.
    pub fn read_from(&self, offset: u64) -> Option<(&[u8], &[u8])> {
        if offset > self.total_written {
            return None;
        }
        let oldest = self.total_written.saturating_sub(self.capacity as u64);
        if offset < oldest {
            return None;
        }

        let available = (self.total_written - offset) as usize;
        if available == 0 {
            return Some((&[], &[]));
        }

        let start = if self.write_pos >= available {
            self.write_pos - available
        } else {
            self.capacity - (available - self.write_pos)
        };

        if start + available <= self.capacity {
            Some((&self.buf[start..start + available], &[]))
        } else {
            let first = self.capacity - start;
            Some((&self.buf[start..self.capacity], &self.buf[..available - first]))
        }
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Concatenate the full currently-retained window into one buffer.
    pub fn snapshot_bytes(&self) -> Vec<u8> {
        let oldest = self.total_written.saturating_sub(self.capacity as u64);
        match self.read_from(oldest) {
            Some((a, b)) => [a, b].concat(),
            None => Vec::new(),
        }
    }

    /// Last `n` newline-delimited lines from the retained window, used to
    /// answer `replay-history`.
    pub fn last_lines(&self, n: usize) -> Vec<String> {
        if n == 0 {
            return Vec::new();
        }
        let all = self.snapshot_bytes();
        let text = String::from_utf8_lossy(&all);
        let mut lines: Vec<&str> = text.lines().collect();
        if lines.len() > n {
            lines = lines.split_off(lines.len() - n);
        }
        lines.into_iter().map(str::to_owned).collect()
    }
}

#[cfg(test)]
#[path = "scrollback_tests.rs"]
mod tests;
