// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace operations: deploy, destroy, mode, status, list, logs.

use clap::{Parser, Subcommand};
use pv_cli::output::{fmt_time, table};
use pv_cli::{CliContext, ExitError};
use std::io::Write;

#[derive(Parser)]
#[command(name = "workspacectl", version, about = "Manage provisioner workspaces")]
struct Cli {
    /// Use dev directory defaults (., ./state, ./logs)
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deploy a workspace now, bypassing its schedule
    Deploy {
        workspace: String,
        /// Deployment mode (required for mode-based workspaces)
        #[arg(long)]
        mode: Option<String>,
    },
    /// Destroy a workspace now, bypassing its schedule
    Destroy { workspace: String },
    /// Deploy a workspace in the given mode, confirming a mode switch
    Mode {
        workspace: String,
        mode: String,
        /// Skip the mode-switch confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Show one workspace's state (managed plus probed ground truth)
    Status { workspace: Option<String> },
    /// List workspaces with their schedules
    List,
    /// Print a workspace's operation log
    Logs { workspace: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("workspacectl: {}", e.message);
        std::process::exit(e.code);
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let ctx = CliContext::open(cli.dev)?;
    match cli.command {
        Command::Deploy { workspace, mode } => {
            ctx.ops.deploy(&workspace, mode.as_deref()).await?;
            println!("{} deployed", workspace);
        }
        Command::Destroy { workspace } => {
            ctx.ops.destroy(&workspace).await?;
            println!("{} destroyed", workspace);
        }
        Command::Mode { workspace, mode, yes } => {
            ctx.ops
                .mode(&workspace, &mode, |current, requested| {
                    if yes {
                        return true;
                    }
                    confirm(&format!(
                        "{} is deployed in mode '{}'; switch to '{}'?",
                        workspace, current, requested
                    ))
                })
                .await?;
            println!("{} deployed in mode {}", workspace, mode);
        }
        Command::Status { workspace: Some(name) } => {
            let report = ctx.ops.status(&name)?;
            println!("workspace:     {}", report.name);
            println!("status:        {}", report.state.status);
            if let Some(probed) = report.probed {
                println!("actual state:  {} (from tool state)", probed);
            }
            if let Some(mode) = &report.state.deployment_mode {
                println!("mode:          {}", mode);
            }
            println!("last deployed: {}", fmt_time(report.state.last_deployed));
            println!("last destroyed:{}", fmt_time(report.state.last_destroyed));
            if report.state.last_deployed.is_none() {
                if let Some(mtime) = report.artifact_mtime {
                    println!("state changed: {}", fmt_time(Some(mtime)));
                }
            }
            if let Some(error) = &report.state.last_deploy_error {
                println!("deploy error:  {}", error);
            }
            if let Some(error) = &report.state.last_destroy_error {
                println!("destroy error: {}", error);
            }
        }
        Command::Status { workspace: None } | Command::List => {
            let rows: Vec<Vec<String>> = ctx
                .ops
                .list()?
                .into_iter()
                .map(|l| {
                    vec![
                        l.name,
                        if l.enabled { "yes".into() } else { "no".into() },
                        l.status.to_string(),
                        l.schedule,
                    ]
                })
                .collect();
            print!("{}", table(&["NAME", "ENABLED", "STATUS", "SCHEDULE"], &rows));
        }
        Command::Logs { workspace } => {
            print!("{}", ctx.ops.logs(&workspace)?);
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}
