// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template registry operations: add, list, show, update, remove, validate.

use chrono::Utc;
use clap::{Parser, Subcommand};
use pv_cli::output::{fmt_time, table};
use pv_cli::{CliContext, ExitError};
use pv_engine::templates::UpdateOutcome;

#[derive(Parser)]
#[command(name = "templatectl", version, about = "Manage provisioner templates")]
struct Cli {
    /// Use dev directory defaults (., ./state, ./logs)
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and register a template from a source repository
    Add {
        name: String,
        url: String,
        /// Path of the template tree within the repository
        #[arg(long, default_value = ".")]
        path: String,
        /// Tag, branch, or commit to fetch
        #[arg(long = "ref")]
        source_ref: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// List registered templates
    List,
    /// Show one template's metadata
    Show { name: String },
    /// Refetch a template (or all) and record a new content hash
    Update {
        /// Template name; all templates when omitted
        name: Option<String>,
    },
    /// Remove a template's metadata and stored tree
    Remove {
        name: String,
        /// Remove even if workspaces reference it
        #[arg(long)]
        force: bool,
    },
    /// Re-hash stored trees against recorded hashes
    Validate { name: Option<String> },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("templatectl: {}", e.message);
        std::process::exit(e.code);
    }
}

async fn run(cli: Cli) -> Result<(), ExitError> {
    let ctx = CliContext::open(cli.dev)?;
    let templates = &ctx.engine.templates;
    match cli.command {
        Command::Add { name, url, path, source_ref, description } => {
            let meta = templates
                .add(&name, &url, &path, source_ref.as_deref(), description.as_deref(), Utc::now())
                .await?;
            println!("added {} ({})", meta.name, short_hash(&meta.content_hash));
        }
        Command::List => {
            let rows: Vec<Vec<String>> = templates
                .list()
                .into_iter()
                .map(|m| {
                    vec![
                        m.name,
                        format!("v{}", m.version),
                        short_hash(&m.content_hash),
                        fmt_time(Some(m.updated_at)),
                    ]
                })
                .collect();
            print!("{}", table(&["NAME", "VERSION", "HASH", "UPDATED"], &rows));
        }
        Command::Show { name } => {
            let meta = templates
                .get(&name)
                .ok_or_else(|| ExitError::failure(format!("template not found: {}", name)))?;
            println!("name:        {}", meta.name);
            println!("source:      {}", meta.source_url);
            println!("path:        {}", meta.source_path);
            if let Some(r) = &meta.source_ref {
                println!("ref:         {}", r);
            }
            println!("version:     v{}", meta.version);
            println!("hash:        {}", meta.content_hash);
            println!("created:     {}", fmt_time(Some(meta.created_at)));
            println!("updated:     {}", fmt_time(Some(meta.updated_at)));
            if let Some(d) = &meta.description {
                println!("description: {}", d);
            }
        }
        Command::Update { name } => {
            let results = match name {
                Some(name) => vec![(name.clone(), templates.update(&name, Utc::now()).await)],
                None => templates.update_all(Utc::now()).await,
            };
            let mut failed = false;
            for (name, result) in results {
                match result {
                    Ok(UpdateOutcome::Unchanged) => println!("{}: unchanged", name),
                    Ok(UpdateOutcome::Updated { new_hash, .. }) => {
                        println!("{}: updated ({})", name, short_hash(&new_hash));
                    }
                    Err(e) => {
                        eprintln!("{}: {}", name, e);
                        failed = true;
                    }
                }
            }
            if failed {
                return Err(ExitError::failure("one or more updates failed"));
            }
        }
        Command::Remove { name, force } => {
            if !force {
                if let Some(referencing) = first_referencing_workspace(&ctx, &name)? {
                    return Err(ExitError::failure(format!(
                        "template '{}' is referenced by workspace '{}' (use --force)",
                        name, referencing
                    )));
                }
            }
            templates.remove(&name)?;
            println!("removed {}", name);
        }
        Command::Validate { name } => {
            let reports = match name {
                Some(name) => vec![(name.clone(), templates.validate(&name))],
                None => templates.validate_all(),
            };
            let mut dirty = false;
            for (name, report) in reports {
                match report {
                    Ok(r) if r.is_clean() => println!("{}: ok", name),
                    Ok(r) => {
                        eprintln!(
                            "{}: drift (stored {}, actual {})",
                            name,
                            short_hash(&r.stored_hash),
                            short_hash(&r.actual_hash)
                        );
                        dirty = true;
                    }
                    Err(e) => {
                        eprintln!("{}: {}", name, e);
                        dirty = true;
                    }
                }
            }
            if dirty {
                return Err(ExitError::failure("validation failed"));
            }
        }
    }
    Ok(())
}

fn short_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}

fn first_referencing_workspace(
    ctx: &CliContext,
    template: &str,
) -> Result<Option<String>, ExitError> {
    let registry = pv_config::WorkspaceRegistry::load(&ctx.roots)
        .map_err(|e| ExitError::failure(e.to_string()))?;
    Ok(registry
        .workspaces
        .values()
        .find(|ws| ws.template.as_deref() == Some(template))
        .map(|ws| ws.name.clone()))
}
