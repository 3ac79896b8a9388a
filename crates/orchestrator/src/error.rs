// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The controller's closed error taxonomy (spec.md §7), plus the
//! exit-code and stable-string projections the admin CLI and any future
//! wire transport need.

use std::fmt;

use basecamp_ptyhost::error::{HostError, SpawnErrorCode};
use basecamp_taskqueue::TaskQueueError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed error-kind set from spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    DependencyMissing,
    CycleDetected,
    SpawnFailed,
    IoError,
    Timeout,
    CircuitOpen,
    Cancelled,
    Corrupted,
    Unavailable,
    Disconnected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::InvalidState => "INVALID_STATE",
            Self::DependencyMissing => "DEPENDENCY_MISSING",
            Self::CycleDetected => "CYCLE_DETECTED",
            Self::SpawnFailed => "SPAWN_FAILED",
            Self::IoError => "IO_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::Cancelled => "CANCELLED",
            Self::Corrupted => "CORRUPTED",
            Self::Unavailable => "UNAVAILABLE",
            Self::Disconnected => "DISCONNECTED",
        }
    }

    /// HTTP-status-shaped projection, kept for parity with the teacher's
    /// `ErrorCode::http_status` even though this repo's Controller API has
    /// no HTTP transport of its own (spec.md §6 leaves the controller
    /// wire format to the implementer; this is the hook a future one
    /// would use).
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidState => 409,
            Self::DependencyMissing => 422,
            Self::CycleDetected => 422,
            Self::SpawnFailed => 502,
            Self::IoError => 500,
            Self::Timeout => 504,
            Self::CircuitOpen => 503,
            Self::Cancelled => 409,
            Self::Corrupted => 502,
            Self::Unavailable => 503,
            Self::Disconnected => 410,
        }
    }

    /// Exit-code projection for the admin CLI (spec.md §6): `0` success
    /// is never represented here (that's the absence of an error); `1`
    /// usage is raised by argument parsing, not this enum.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound => 3,
            Self::CircuitOpen => 4,
            _ => 2,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-visible controller error: stable kind, human-readable message,
/// and a reference id UIs can tie to the originating request for retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerError {
    pub kind: ErrorKind,
    pub message: String,
    pub reference_id: String,
}

impl ControllerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), reference_id: Uuid::new_v4().to_string() }
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.reference_id, self.message)
    }
}

impl std::error::Error for ControllerError {}

impl From<TaskQueueError> for ControllerError {
    fn from(err: TaskQueueError) -> Self {
        let kind = match &err {
            TaskQueueError::NotFound(_) => ErrorKind::NotFound,
            TaskQueueError::InvalidState { .. } => ErrorKind::InvalidState,
            TaskQueueError::DependencyMissing(_) => ErrorKind::DependencyMissing,
            TaskQueueError::CycleDetected { .. } => ErrorKind::CycleDetected,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<HostError> for ControllerError {
    fn from(err: HostError) -> Self {
        use basecamp_ptyhost::error::ErrorCode as HostCode;
        let kind = match err.code {
            HostCode::NotFound => ErrorKind::NotFound,
            HostCode::InvalidState => ErrorKind::InvalidState,
            HostCode::SpawnFailed => ErrorKind::SpawnFailed,
            HostCode::IoError => ErrorKind::IoError,
            HostCode::Timeout => ErrorKind::Timeout,
            HostCode::CircuitOpen => ErrorKind::CircuitOpen,
            HostCode::Cancelled => ErrorKind::Cancelled,
            HostCode::Corrupted => ErrorKind::Corrupted,
            HostCode::Unavailable => ErrorKind::Unavailable,
            HostCode::Disconnected => ErrorKind::Disconnected,
        };
        Self::new(kind, err.message)
    }
}

/// Maps a PTY Host spawn failure sub-code onto the same closed set spec.md
/// §4.3 lists: `{ENOENT, EACCES, ENOTDIR, EIO, DISCONNECTED, UNKNOWN}`.
pub fn describe_spawn_failure(code: SpawnErrorCode) -> &'static str {
    match code {
        SpawnErrorCode::Enoent => "ENOENT",
        SpawnErrorCode::Eacces => "EACCES",
        SpawnErrorCode::Enotdir => "ENOTDIR",
        SpawnErrorCode::Eio => "EIO",
        SpawnErrorCode::Disconnected => "DISCONNECTED",
        SpawnErrorCode::Unknown => "UNKNOWN",
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
