// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The provisioner daemon: load configuration, take the instance lock,
//! synthesize `@reboot`, and run the scheduler until SIGINT/SIGTERM.

use clap::Parser;
use fs2::FileExt;
use pv_adapters::{ProvisionerClient, TofuClient};
use pv_cli::ExitError;
use pv_config::{Roots, WorkspaceRegistry};
use pv_core::SystemClock;
use pv_engine::{Engine, Scheduler};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "provisionerd", version, about = "Workspace scheduling daemon")]
struct Cli {
    /// Use dev directory defaults (., ./state, ./logs)
    #[arg(long)]
    dev: bool,

    /// Print the full version banner and exit
    #[arg(long)]
    version_full: bool,
}

fn main() {
    let cli = Cli::parse();
    if cli.version_full {
        print_version_full();
        return;
    }
    if let Err(e) = run(cli) {
        eprintln!("provisionerd: {}", e.message);
        std::process::exit(e.code);
    }
}

fn print_version_full() {
    println!(
        "provisionerd {} ({} {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    );
}

fn run(cli: Cli) -> Result<(), ExitError> {
    let roots = Roots::resolve(cli.dev);
    std::fs::create_dir_all(&roots.state_dir)
        .map_err(|e| ExitError::failure(format!("cannot create state dir: {}", e)))?;
    std::fs::create_dir_all(&roots.log_dir)
        .map_err(|e| ExitError::failure(format!("cannot create log dir: {}", e)))?;

    // Journal: stdout in dev, file appender otherwise.
    let _guard = init_tracing(&roots, cli.dev);

    // Instance lock first; a second daemon must not share the state files.
    let lock_file = acquire_lock(&roots)?;

    std::fs::write(roots.state_dir.join("version"), env!("CARGO_PKG_VERSION"))
        .map_err(|e| ExitError::failure(format!("cannot write version file: {}", e)))?;

    // A circular job dependency fails the whole load.
    let registry = WorkspaceRegistry::load(&roots)
        .map_err(|e| ExitError::failure(format!("configuration load failed: {}", e)))?;
    for (name, error) in &registry.errors {
        warn!(workspace = %name, error = %error, "invalid configuration skipped");
    }

    let client: Arc<dyn ProvisionerClient> = Arc::new(TofuClient::from_env());
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| ExitError::failure(format!("runtime start failed: {}", e)))?;
    runtime.block_on(async {
        let engine = Arc::new(
            Engine::open(roots.clone(), client, SystemClock)
                .map_err(|e| ExitError::failure(e.to_string()))?,
        );
        let scheduler = Scheduler::new(Arc::clone(&engine), registry);

        info!(
            config = %roots.config_dir.display(),
            state = %roots.state_dir.display(),
            "provisionerd {} starting",
            env!("CARGO_PKG_VERSION")
        );
        engine.deployer.emit_reboot();

        let cancel = CancellationToken::new();
        tokio::spawn(wait_for_shutdown(cancel.clone()));
        scheduler.run(cancel).await;

        info!("provisionerd stopped");
        Ok::<(), ExitError>(())
    })?;

    drop(lock_file);
    Ok(())
}

fn acquire_lock(roots: &Roots) -> Result<std::fs::File, ExitError> {
    // Avoid truncating before we hold the lock, which would wipe the
    // running daemon's PID.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(roots.lock_file())
        .map_err(|e| ExitError::failure(format!("cannot open lock file: {}", e)))?;
    lock_file
        .try_lock_exclusive()
        .map_err(|_| ExitError::failure("another provisionerd instance is running"))?;
    lock_file
        .set_len(0)
        .and_then(|_| writeln!(lock_file, "{}", std::process::id()))
        .map_err(|e| ExitError::failure(format!("cannot write lock file: {}", e)))?;
    Ok(lock_file)
}

fn init_tracing(roots: &Roots, dev: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if dev {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return None;
    }
    let appender = tracing_appender::rolling::never(&roots.log_dir, "provisionerd.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Some(guard)
}

async fn wait_for_shutdown(cancel: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler");
                let _ = ctrl_c.await;
                cancel.cancel();
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => info!("SIGINT received"),
            _ = sigterm.recv() => info!("SIGTERM received"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
    cancel.cancel();
}
