// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VCS status probing, behind a trait so the monitor is testable without
//! shelling out to a real `git` binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::hash::FileDelta;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one VCS status fetch.
#[derive(Debug, Clone, Default)]
pub struct VcsStatus {
    pub deltas: Vec<FileDelta>,
    pub branch: Option<String>,
}

/// Failure modes a probe can report. `IndexLocked` is handled specially by
/// the circuit breaker: it is logged and skipped rather than counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsError {
    DirectoryMissing,
    IndexLocked,
    CommandTimedOut,
    CommandFailed(String),
}

impl std::fmt::Display for VcsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryMissing => write!(f, "worktree directory no longer exists"),
            Self::IndexLocked => write!(f, "index.lock present"),
            Self::CommandTimedOut => write!(f, "vcs command timed out"),
            Self::CommandFailed(s) => write!(f, "vcs command failed: {s}"),
        }
    }
}

impl std::error::Error for VcsError {}

/// Abstraction over "fetch the current change set for this worktree".
pub trait VcsProbe: Send + Sync {
    fn status(&self, path: &Path) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<VcsStatus, VcsError>> + Send + '_>>;
}

/// Default probe: runs `git status --porcelain=v2` and `git diff
/// --numstat` with a 5s timeout, mirroring the teacher's subprocess
/// invocation style (working directory set, output captured, timeout
/// wrapping `.output()`).
#[derive(Debug, Default, Clone, Copy)]
pub struct GitProbe;

impl VcsProbe for GitProbe {
    fn status(
        &self,
        path: &Path,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<VcsStatus, VcsError>> + Send + '_>>
    {
        let path = path.to_path_buf();
        Box::pin(async move { git_status(&path).await })
    }
}

async fn git_status(path: &Path) -> Result<VcsStatus, VcsError> {
    if !path.is_dir() {
        return Err(VcsError::DirectoryMissing);
    }
    if path.join(".git").join("index.lock").exists() {
        return Err(VcsError::IndexLocked);
    }

    let porcelain = run_git(path, &["status", "--porcelain=v2", "--branch"]).await?;
    let numstat = run_git(path, &["diff", "--numstat", "HEAD"]).await.unwrap_or_default();

    Ok(parse_status(&porcelain, &numstat))
}

async fn run_git(path: &Path, args: &[&str]) -> Result<String, VcsError> {
    let mut cmd = Command::new("git");
    cmd.current_dir(path).args(args).kill_on_drop(true);

    let output = timeout(COMMAND_TIMEOUT, cmd.output())
        .await
        .map_err(|_| VcsError::CommandTimedOut)?
        .map_err(|e| VcsError::CommandFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("index.lock") {
            return Err(VcsError::IndexLocked);
        }
        return Err(VcsError::CommandFailed(stderr.trim().to_owned()));
    }

    String::from_utf8(output.stdout).map_err(|e| VcsError::CommandFailed(e.to_string()))
}

fn parse_status(porcelain: &str, numstat: &str) -> VcsStatus {
    let mut numstat_by_path = std::collections::HashMap::new();
    for line in numstat.lines() {
        let mut parts = line.splitn(3, '\t');
        let (Some(added), Some(removed), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let added = added.parse().unwrap_or(0);
        let removed = removed.parse().unwrap_or(0);
        numstat_by_path.insert(path.to_owned(), (added, removed));
    }

    let mut branch = None;
    let mut deltas = Vec::new();
    for line in porcelain.lines() {
        if let Some(rest) = line.strip_prefix("# branch.head ") {
            branch = Some(rest.to_owned());
            continue;
        }
        if !line.starts_with('1') && !line.starts_with('2') && !line.starts_with('?') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let Some(kind) = fields.next() else { continue };
        if kind == "?" {
            let Some(path) = fields.next() else { continue };
            deltas.push(FileDelta { path: path.to_owned(), status: "??".to_owned(), added: 0, removed: 0 });
            continue;
        }
        let Some(xy) = fields.next() else { continue };
        // Porcelain v2 status lines have several positional fields before
        // the path; skip to the path token at the end of the line.
        let path = line.rsplit(' ').next().unwrap_or_default().to_owned();
        let (added, removed) = numstat_by_path.get(&path).copied().unwrap_or((0, 0));
        deltas.push(FileDelta { path, status: xy.to_owned(), added, removed });
    }

    VcsStatus { deltas, branch }
}

/// Resolve the canonical path used to key a worktree, falling back to the
/// raw path if canonicalization fails (e.g. not yet created).
pub async fn canonical_or_raw(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path).await.unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;
