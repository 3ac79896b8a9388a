// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller-side client for the isolated PTY Host process (spec.md
//! §4.3, §9 "cyclic references... replaced by opaque ids plus a lookup
//! table"). The host is a real child process talking newline-delimited
//! JSON over stdio (`basecamp_ptyhost::main`); this client owns that
//! child, forwards `Request`s to its stdin, and fans its `Event` stream
//! out to subscribers. A crash is classified via
//! [`basecamp_ptyhost::error::HostCrashKind`] so the controller can
//! respawn — it never reaches into host-owned memory directly, only
//! through this handle.

use std::fmt;
use std::process::Stdio;

use basecamp_ptyhost::error::HostCrashKind;
use basecamp_ptyhost::protocol::{Event, Request};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

/// Errors a [`PtyHostClient`] operation can fail with.
#[derive(Debug)]
pub enum PtyClientError {
    Spawn(std::io::Error),
    Disconnected,
    Encode(serde_json::Error),
}

impl fmt::Display for PtyClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(err) => write!(f, "failed to spawn pty host process: {err}"),
            Self::Disconnected => write!(f, "pty host stdin is closed (host disconnected)"),
            Self::Encode(err) => write!(f, "failed to encode request: {err}"),
        }
    }
}

impl std::error::Error for PtyClientError {}

impl From<std::io::Error> for PtyClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Spawn(err)
    }
}

impl From<serde_json::Error> for PtyClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err)
    }
}

/// A handle to a supervised PTY Host child process.
pub struct PtyHostClient {
    child: Mutex<Child>,
    stdin: Mutex<ChildStdin>,
    events: broadcast::Sender<Event>,
    _reader: JoinHandle<()>,
}

impl PtyHostClient {
    /// Spawn `binary` as a child process and begin forwarding its event
    /// stream. `envs` carries the host's own config overrides (e.g.
    /// `BASECAMP_RING_SIZE`) so the controller doesn't need to know the
    /// host's full configuration surface.
    pub async fn spawn(
        binary: &std::path::Path,
        envs: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, PtyClientError> {
        let mut child = Command::new(binary)
            .envs(envs)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(PtyClientError::Disconnected)?;
        let stdout = child.stdout.take().ok_or(PtyClientError::Disconnected)?;

        let (events_tx, _) = broadcast::channel(1024);
        let reader_events = events_tx.clone();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => match serde_json::from_str::<Event>(&line) {
                        Ok(event) => {
                            let _ = reader_events.send(event);
                        }
                        Err(err) => warn!(error = %err, "failed to parse pty host event"),
                    },
                    Ok(None) => return,
                    Err(err) => {
                        warn!(error = %err, "pty host stdout read error");
                        return;
                    }
                }
            }
        });

        Ok(Self { child: Mutex::new(child), stdin: Mutex::new(stdin), events: events_tx, _reader: reader })
    }

    /// Subscribe to the host's event stream. Each subscriber gets every
    /// event published after it subscribes; a subscriber that falls
    /// behind the broadcast channel's capacity observes a lagged error on
    /// its next recv, per `tokio::sync::broadcast` semantics.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Send one request to the host's stdin as a single JSON line.
    /// `write`/`submit` never block indefinitely (spec.md §5): a closed
    /// stdin pipe fails fast with [`PtyClientError::Disconnected`] rather
    /// than hanging.
    pub async fn send(&self, request: &Request) -> Result<(), PtyClientError> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(line.as_bytes()).await.map_err(|_| PtyClientError::Disconnected)?;
        Ok(())
    }

    /// Check whether the child has exited without blocking, classifying
    /// the exit per spec.md §4.3's closed crash-kind set. `None` means
    /// the host is still alive.
    pub async fn poll_crash(&self) -> Option<HostCrashKind> {
        let mut child = self.child.lock().await;
        match child.try_wait() {
            Ok(Some(status)) => {
                #[cfg(unix)]
                let signal = {
                    use std::os::unix::process::ExitStatusExt;
                    status.signal()
                };
                #[cfg(not(unix))]
                let signal = None;
                Some(HostCrashKind::classify(status.code(), signal))
            }
            _ => None,
        }
    }

    /// Gracefully dispose of the host: send `Dispose` and let it exit on
    /// its own. The controller must spawn a fresh client if it wants the
    /// host back.
    pub async fn dispose(&self) -> Result<(), PtyClientError> {
        self.send(&Request::Dispose).await
    }
}

#[cfg(test)]
#[path = "pty_client_tests.rs"]
mod tests;
