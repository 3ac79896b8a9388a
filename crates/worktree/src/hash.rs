// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic hash over a worktree's sorted file-delta signature, used
//! to detect whether anything changed since the last emitted snapshot.

use sha2::{Digest, Sha256};

/// One file's change signature: path plus a status marker (e.g. `M`, `A`,
/// `D`, `??`) and, where available, a numstat line-delta pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileDelta {
    pub path: String,
    pub status: String,
    pub added: u64,
    pub removed: u64,
}

/// Hash the sorted file-delta signature into a stable hex digest.
///
/// Sorting first means the hash only changes when the change *set*
/// changes, not when the VCS happens to report entries in a different
/// order between polls.
pub fn hash_delta(deltas: &[FileDelta]) -> String {
    let mut sorted: Vec<&FileDelta> = deltas.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for d in sorted {
        hasher.update(d.path.as_bytes());
        hasher.update(b"\0");
        hasher.update(d.status.as_bytes());
        hasher.update(b"\0");
        hasher.update(d.added.to_le_bytes());
        hasher.update(d.removed.to_le_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
