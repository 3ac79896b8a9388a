// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod nbio;
pub mod spawn;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// How a child process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

pub use spawn::NativePty;

/// PTY backend abstraction, object-safe for use as `Box<dyn Backend>`.
pub trait Backend: Send + Sync + 'static {
    /// Drives PTY I/O until the child exits or `input_rx` is dropped.
    /// Takes `&self`: implementations use interior mutability (atomics,
    /// shared fds) so a backend can be held in an `Arc` and resized
    /// concurrently with its running I/O loop.
    fn run(
        &self,
        output_tx: mpsc::Sender<Bytes>,
        input_rx: mpsc::Receiver<Bytes>,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ExitStatus>> + Send + '_>>;

    fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()>;

    fn child_pid(&self) -> Option<u32>;
}
