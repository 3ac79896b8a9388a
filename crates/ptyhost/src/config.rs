// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// PTY Host process configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "basecamp-ptyhost", version, about)]
pub struct HostConfig {
    /// Directory for persisted state (snapshots, event log).
    #[arg(long, env = "BASECAMP_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Ring buffer size in bytes for `active`-tier sessions. Must be a
    /// power of two.
    #[arg(long, env = "BASECAMP_RING_SIZE", default_value = "1048576")]
    pub ring_size: usize,

    /// Polling interval in milliseconds for `active`-tier sessions.
    #[arg(long, env = "BASECAMP_ACTIVE_POLL_MS", default_value = "50")]
    pub active_poll_ms: u64,

    /// Polling interval in milliseconds for `background`-tier sessions.
    #[arg(long, env = "BASECAMP_BACKGROUND_POLL_MS", default_value = "500")]
    pub background_poll_ms: u64,

    /// Upper ring-utilization watermark (percent) that triggers `paused`.
    #[arg(long, env = "BASECAMP_WATERMARK_HIGH", default_value = "90")]
    pub watermark_high: u8,

    /// Lower ring-utilization watermark (percent) that triggers `resumed`.
    #[arg(long, env = "BASECAMP_WATERMARK_LOW", default_value = "60")]
    pub watermark_low: u8,

    /// Handshake fallback timeout in seconds for resume-health-check.
    #[arg(long, env = "BASECAMP_HANDSHAKE_TIMEOUT_SECS", default_value = "5")]
    pub handshake_timeout_secs: u64,

    /// Output quiescence timeout in milliseconds before a `working`
    /// session is inferred to have returned to `idle`.
    #[arg(long, env = "BASECAMP_IDLE_TIMEOUT_MS", default_value = "2000")]
    pub idle_timeout_ms: u64,

    /// Scrollback capacity in bytes, used for `background`-tier sessions
    /// and `replay-history` on any session.
    #[arg(long, env = "BASECAMP_SCROLLBACK_SIZE", default_value = "262144")]
    pub scrollback_size: usize,

    /// Housekeeping tick interval in milliseconds (idle detection,
    /// background-tier snapshot refresh, handshake fallback checks).
    #[arg(long, env = "BASECAMP_HOUSEKEEPING_MS", default_value = "250")]
    pub housekeeping_ms: u64,

    /// Log format: json or text.
    #[arg(long, env = "BASECAMP_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BASECAMP_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// TERM environment variable for spawned children.
    #[arg(long, env = "TERM", default_value = "xterm-256color")]
    pub term: String,
}

impl HostConfig {
    /// Validate cross-field invariants not expressible via `clap` alone.
    pub fn validate(&self) -> Result<(), String> {
        if !self.ring_size.is_power_of_two() {
            return Err("ring_size must be a power of two".to_owned());
        }
        if self.watermark_low >= self.watermark_high {
            return Err("watermark_low must be less than watermark_high".to_owned());
        }
        if self.watermark_high > 100 {
            return Err("watermark_high must be <= 100".to_owned());
        }
        Ok(())
    }

    /// Initialise the global `tracing` subscriber per `log_format`/`log_level`.
    pub fn init_tracing(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(self.log_level.clone()));

        if self.log_format == "json" {
            tracing_subscriber::fmt().json().with_env_filter(filter).init();
        } else {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
