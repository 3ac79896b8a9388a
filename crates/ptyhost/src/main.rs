// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, warn};

use basecamp_ptyhost::config::HostConfig;
use basecamp_ptyhost::host::Host;
use basecamp_ptyhost::protocol::Request;

/// Requests arrive as newline-delimited JSON on stdin; events are emitted
/// the same way on stdout. The controller owns process lifecycle and is
/// expected to respawn the host on unexpected exit (see
/// `host::classify_host_crash`).
#[tokio::main]
async fn main() {
    let config = HostConfig::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
    config.init_tracing();

    let (events_tx, mut events_rx) = mpsc::channel(1024);
    let mut host = Host::new(config.clone(), events_tx);
    host.announce_ready().await;

    let mut housekeeping = tokio::time::interval(std::time::Duration::from_millis(config.housekeeping_ms));
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Request>(&line) {
                            Ok(req) => {
                                let dispose = matches!(req, Request::Dispose);
                                for event in host.handle(req).await {
                                    if write_event(&mut stdout, &event).await.is_err() {
                                        return;
                                    }
                                }
                                if dispose {
                                    return;
                                }
                            }
                            Err(e) => warn!(error = %e, "failed to parse request"),
                        }
                    }
                    Ok(None) => {
                        // Controller closed stdin: treat as an implicit dispose.
                        host.handle(Request::Dispose).await;
                        return;
                    }
                    Err(e) => {
                        error!(error = %e, "stdin read error");
                        return;
                    }
                }
            }
            _ = housekeeping.tick() => {
                for event in host.housekeeping_tick().await {
                    if write_event(&mut stdout, &event).await.is_err() {
                        return;
                    }
                }
            }
            event = events_rx.recv() => {
                match event {
                    Some(event) => {
                        if write_event(&mut stdout, &event).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
        }
    }
}

async fn write_event(
    stdout: &mut tokio::io::Stdout,
    event: &basecamp_ptyhost::protocol::Event,
) -> std::io::Result<()> {
    let mut line = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_owned());
    line.push('\n');
    stdout.write_all(line.as_bytes()).await
}
