// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Controller process configuration: where persisted state lives, how to
//! reach the PTY Host binary, and the ambient logging knobs every
//! `basecamp` binary shares (spec.md §6, SPEC_FULL.md §6).

use std::path::PathBuf;

use clap::Parser;

/// Controller configuration, shared by the `basecamp` admin binary and
/// any embedder of [`crate::system::System`].
#[derive(Debug, Clone, Parser)]
#[command(name = "basecamp", version, about)]
pub struct ControllerConfig {
    /// Base directory for persisted state: the task-queue JSONL log and
    /// per-worktree note files. Spec.md §6: "a single base-path variable
    /// selects where persisted state lives."
    #[arg(long, env = "BASECAMP_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Path to the `basecamp-ptyhost` binary this controller supervises
    /// and respawns on crash.
    #[arg(long, env = "BASECAMP_PTYHOST_BIN", default_value = "basecamp-ptyhost")]
    pub ptyhost_bin: PathBuf,

    /// Circuit-breaker trip threshold for worktree monitors.
    #[arg(long, env = "BASECAMP_BREAKER_THRESHOLD", default_value = "3")]
    pub breaker_threshold: u32,

    /// Base polling interval (ms) for worktree monitors.
    #[arg(long, env = "BASECAMP_WORKTREE_BASE_INTERVAL_MS", default_value = "2000")]
    pub worktree_base_interval_ms: u64,

    /// Max polling interval (ms) for worktree monitors under backoff.
    #[arg(long, env = "BASECAMP_WORKTREE_MAX_INTERVAL_MS", default_value = "30000")]
    pub worktree_max_interval_ms: u64,

    /// Debounce delay (ms) before a dirty-and-still-dirty worktree
    /// triggers its downstream AI summary.
    #[arg(long, env = "BASECAMP_AI_BUFFER_DELAY_MS", default_value = "10000")]
    pub ai_buffer_delay_ms: u64,

    /// Log format: json or text.
    #[arg(long, env = "BASECAMP_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BASECAMP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.worktree_base_interval_ms == 0 {
            return Err("worktree_base_interval_ms must be > 0".to_owned());
        }
        if self.worktree_max_interval_ms < self.worktree_base_interval_ms {
            return Err("worktree_max_interval_ms must be >= worktree_base_interval_ms".to_owned());
        }
        Ok(())
    }

    /// Initialise the global `tracing` subscriber per `log_format`/`log_level`,
    /// exactly as the PTY Host binary does (`basecamp_ptyhost::config::HostConfig::init_tracing`).
    pub fn init_tracing(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(self.log_level.clone()));

        if self.log_format == "json" {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        } else {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    /// Resolve the directory persisted state lives under, defaulting to
    /// a per-user state directory when unset.
    pub fn resolved_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir)
                .join(".basecamp")
        })
    }

    pub fn task_store_path(&self) -> PathBuf {
        self.resolved_state_dir().join("tasks.jsonl")
    }

    pub fn worktree_meta_dir(&self, worktree_path: &std::path::Path) -> PathBuf {
        worktree_path.join(".basecamp")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
