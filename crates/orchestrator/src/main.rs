// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use basecamp::admin::AdminCommand;
use basecamp::config::ControllerConfig;

#[derive(clap::Parser)]
#[command(name = "basecamp", version, about = "Session-orchestration controller for AI coding agents.")]
struct Cli {
    #[command(flatten)]
    config: ControllerConfig,

    #[command(subcommand)]
    command: Option<AdminCommand>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
    cli.config.init_tracing();

    match cli.command {
        Some(command) => {
            std::process::exit(basecamp::admin::run(command, cli.config).await);
        }
        None => {
            // No subcommand: run the controller itself, supervising the
            // PTY Host and every watched worktree until killed.
            match basecamp::system::start_default(cli.config).await {
                Ok(_system) => {
                    tracing::info!("basecamp controller started");
                    std::future::pending::<()>().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "controller failed to start");
                    std::process::exit(e.kind.exit_code());
                }
            }
        }
    }
}
