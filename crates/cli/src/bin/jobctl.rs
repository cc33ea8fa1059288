// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job operations: list, status, run, kill, logs.
//!
//! Without `--workspace` the standalone scope is addressed.

use clap::{Parser, Subcommand};
use pv_cli::output::{fmt_time, table};
use pv_cli::{CliContext, ExitError};
use pv_core::STANDALONE_SCOPE;

#[derive(Parser)]
#[command(name = "jobctl", version, about = "Manage provisioner jobs")]
struct Cli {
    /// Use dev directory defaults (., ./state, ./logs)
    #[arg(long, global = true)]
    dev: bool,

    /// Workspace scope; standalone jobs when omitted
    #[arg(long, short = 'w', global = true)]
    workspace: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the scope's jobs
    List,
    /// Show job state records (one job, or the whole scope)
    Status { name: Option<String> },
    /// Run a job now
    Run { name: String },
    /// Terminate a running job's process group
    Kill { name: String },
    /// Print the scope's operation log
    Logs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("jobctl: {}", e.message);
        std::process::exit(e.code);
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let ctx = CliContext::open(cli.dev)?;
    let scope = cli.workspace.as_deref().unwrap_or(STANDALONE_SCOPE);
    match cli.command {
        Command::List => {
            let rows: Vec<Vec<String>> = ctx
                .ops
                .job_list(scope)?
                .into_iter()
                .map(|def| {
                    let schedules: Vec<String> =
                        def.schedules.iter().map(|s| s.to_string()).collect();
                    vec![
                        def.name,
                        format!("{:?}", def.kind).to_lowercase(),
                        schedules.join(" | "),
                        if def.enabled { "yes".into() } else { "no".into() },
                    ]
                })
                .collect();
            print!("{}", table(&["NAME", "TYPE", "SCHEDULE", "ENABLED"], &rows));
        }
        Command::Status { name } => {
            let rows: Vec<Vec<String>> = ctx
                .ops
                .job_status(scope, name.as_deref())?
                .into_iter()
                .map(|(key, state)| {
                    vec![
                        key,
                        state.status.to_string(),
                        state.run_count.to_string(),
                        state.success_count.to_string(),
                        state.failure_count.to_string(),
                        fmt_time(state.last_run),
                        state.last_error.unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect();
            print!(
                "{}",
                table(&["JOB", "STATUS", "RUNS", "OK", "FAILED", "LAST RUN", "LAST ERROR"], &rows)
            );
        }
        Command::Run { name } => {
            ctx.ops.job_run(scope, &name).await?;
            println!("{}/{} succeeded", scope, name);
        }
        Command::Kill { name } => {
            ctx.ops.job_kill(scope, &name)?;
            println!("{}/{} signalled", scope, name);
        }
        Command::Logs => {
            if scope == STANDALONE_SCOPE {
                let path = ctx.roots.daemon_log();
                match std::fs::read_to_string(&path) {
                    Ok(text) => print!("{}", text),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(ExitError::failure(e.to_string())),
                }
            } else {
                print!("{}", ctx.ops.logs(scope)?);
            }
        }
    }
    Ok(())
}
