// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Closed error taxonomies for the PTY Host: spawn failures, host-crash
//! classification, and the general request error code used in
//! `*-result` replies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// General-purpose error code returned in request replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    NotFound,
    InvalidState,
    SpawnFailed,
    IoError,
    Timeout,
    CircuitOpen,
    Cancelled,
    Corrupted,
    Unavailable,
    Disconnected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::InvalidState => "INVALID_STATE",
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
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-visible error: stable code, human-readable message, and a
/// reference id UIs can tie to the originating request for retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostError {
    pub code: ErrorCode,
    pub message: String,
    pub reference_id: String,
}

impl HostError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), reference_id: uuid::Uuid::new_v4().to_string() }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.reference_id, self.message)
    }
}

impl std::error::Error for HostError {}

/// Closed set of spawn failure sub-codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnErrorCode {
    Enoent,
    Eacces,
    Enotdir,
    Eio,
    Disconnected,
    Unknown,
}

impl SpawnErrorCode {
    /// Classify a `nix::errno::Errno` into the closed spawn-error set.
    pub fn from_errno(errno: nix::errno::Errno) -> Self {
        match errno {
            nix::errno::Errno::ENOENT => Self::Enoent,
            nix::errno::Errno::EACCES => Self::Eacces,
            nix::errno::Errno::ENOTDIR => Self::Enotdir,
            nix::errno::Errno::EIO => Self::Eio,
            _ => Self::Unknown,
        }
    }
}

/// Classification of a PTY Host crash, derived from its exit status.
/// The controller surfaces this and must be prepared to respawn the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostCrashKind {
    OutOfMemory,
    AssertionFailure,
    SignalTerminated,
    CleanExit,
    UnknownCrash,
}

impl HostCrashKind {
    /// Classify a process exit status (code, signal) into the closed set.
    pub fn classify(code: Option<i32>, signal: Option<i32>) -> Self {
        match (code, signal) {
            (Some(0), None) => Self::CleanExit,
            (_, Some(sig)) if sig == nix::sys::signal::Signal::SIGKILL as i32 => Self::OutOfMemory,
            (_, Some(sig)) if sig == nix::sys::signal::Signal::SIGABRT as i32 => {
                Self::AssertionFailure
            }
            (_, Some(_)) => Self::SignalTerminated,
            (Some(_), None) => Self::UnknownCrash,
            (None, None) => Self::UnknownCrash,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
