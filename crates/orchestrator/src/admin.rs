// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `basecamp sessions` / `basecamp tasks` / `basecamp worktree` — the
//! admin CLI surface (spec.md §6), grounded in the teacher's
//! `command::cred` subcommand shape: a `clap::Subcommand` enum per
//! surface plus a `run` returning a process exit code.

use std::path::PathBuf;

use basecamp_taskqueue::{ListFilter, TaskStatus};

use crate::config::ControllerConfig;
use crate::router::NoopRouter;
use crate::system::System;
use crate::worktrees;

#[derive(Debug, clap::Subcommand)]
pub enum AdminCommand {
    /// Inspect live terminal sessions.
    Sessions(SessionsArgs),
    /// Inspect the task queue.
    Tasks(TasksArgs),
    /// Inspect or repair worktree monitoring.
    Worktree(WorktreeArgs),
}

#[derive(Debug, clap::Args)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SessionsCommand {
    /// List every supervised session.
    List,
    /// Print one session's full record.
    Snapshot { id: String },
}

#[derive(Debug, clap::Args)]
pub struct TasksArgs {
    #[command(subcommand)]
    pub command: TasksCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum TasksCommand {
    /// List tasks, optionally filtered.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        worktree: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
pub struct WorktreeArgs {
    #[command(subcommand)]
    pub command: WorktreeCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum WorktreeCommand {
    /// Clear a tripped circuit breaker so polling resumes.
    ResetBreaker { path: PathBuf },
}

/// Exit codes per spec.md §6: `0` success, `2` runtime failure, `3` not
/// found, `4` busy/circuit-open. `1` (usage) is raised by `clap` itself
/// before this function runs.
pub async fn run(command: AdminCommand, config: ControllerConfig) -> i32 {
    match command {
        AdminCommand::Sessions(args) => run_sessions(args, config).await,
        AdminCommand::Tasks(args) => run_tasks(args, config).await,
        AdminCommand::Worktree(args) => run_worktree(args),
    }
}

async fn run_sessions(args: SessionsArgs, config: ControllerConfig) -> i32 {
    let system = match System::start(config, Box::new(NoopRouter)).await {
        Ok(system) => system,
        Err(err) => {
            eprintln!("error: {err}");
            return err.kind.exit_code();
        }
    };

    let code = match args.command {
        SessionsCommand::List => {
            for session in system.list_sessions().await {
                println!("{} {:?} {:?}", session.id, session.kind, session.state);
            }
            0
        }
        SessionsCommand::Snapshot { id } => match system.get_session(&id).await {
            Some(session) => {
                match serde_json::to_string_pretty(&session) {
                    Ok(json) => println!("{json}"),
                    Err(err) => {
                        eprintln!("error: {err}");
                        return 2;
                    }
                }
                0
            }
            None => {
                eprintln!("error: no such session: {id}");
                3
            }
        },
    };

    let _ = system.dispose().await;
    code
}

async fn run_tasks(args: TasksArgs, config: ControllerConfig) -> i32 {
    let system = match System::start(config, Box::new(NoopRouter)).await {
        Ok(system) => system,
        Err(err) => {
            eprintln!("error: {err}");
            return err.kind.exit_code();
        }
    };

    let code = match args.command {
        TasksCommand::List { status, worktree } => {
            let statuses = status.and_then(|s| parse_status(&s)).map(|s| [s].into_iter().collect());
            let filter = ListFilter { statuses, worktree_id: worktree, ..Default::default() };
            for task in system.list_tasks(&filter).await {
                println!(
                    "{} [{}] priority={} status={:?}",
                    task.id, task.title, task.priority, task.status
                );
            }
            0
        }
    };

    let _ = system.dispose().await;
    code
}

fn run_worktree(args: WorktreeArgs) -> i32 {
    match args.command {
        WorktreeCommand::ResetBreaker { path } => match worktrees::request_breaker_reset(&path) {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("error: {err}");
                2
            }
        },
    }
}

fn parse_status(raw: &str) -> Option<TaskStatus> {
    match raw {
        "draft" => Some(TaskStatus::Draft),
        "queued" => Some(TaskStatus::Queued),
        "blocked" => Some(TaskStatus::Blocked),
        "running" => Some(TaskStatus::Running),
        "completed" => Some(TaskStatus::Completed),
        "failed" => Some(TaskStatus::Failed),
        "cancelled" => Some(TaskStatus::Cancelled),
        _ => None,
    }
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
