// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotulo — resilient ZPL label print-dispatch agent.
//
// Entry point. Initialises logging, loads configuration, wires the
// directory, delivery channels, and orchestrator together, and runs the
// poll daemon until SIGINT/SIGTERM.

mod daemon;
mod health;

use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use rotulo_core::error::Result;
use rotulo_core::{AgentConfig, DispatchStats};
use rotulo_dispatch::{HttpConfirmer, JobSource, Orchestrator, OutcomeLog};
use rotulo_print::{DirectoryWatcher, DualChannel, PrinterDirectory};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Rotulo agent starting");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "agent failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = AgentConfig::from_env();
    info!(
        poll_url = %config.poll_url,
        confirm_url = %config.confirm_url,
        printers = %config.printers_path.display(),
        log_dir = %config.log_dir.display(),
        "configuration loaded"
    );

    let stats = Arc::new(DispatchStats::new());
    let directory = Arc::new(PrinterDirectory::open(&config.printers_path));
    let mut watcher = match DirectoryWatcher::spawn(Arc::clone(&directory)) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(error = %e, "printer file watcher unavailable, hot reload disabled");
            None
        }
    };

    let orchestrator = Arc::new(Orchestrator::new(
        DualChannel::new(Arc::clone(&stats)),
        HttpConfirmer::new(config.confirm_url.clone())?,
        Arc::clone(&directory),
        OutcomeLog::new(&config.log_dir),
        Arc::clone(&stats),
    ));
    let source = JobSource::new(config.poll_url.clone())?;

    let shutdown = install_shutdown_handler();
    let reporter = health::spawn_reporter(
        Arc::clone(&orchestrator),
        Arc::clone(&stats),
        shutdown.clone(),
    );

    daemon::run(source, orchestrator, shutdown).await;

    let _ = reporter.await;
    if let Some(w) = watcher.as_mut() {
        w.stop();
    }
    info!("Rotulo agent stopped");
    Ok(())
}

/// Cancelled when SIGTERM or SIGINT arrives; subsystems drain and exit
/// between cycles.
fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGINT handler");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
        trigger.cancel();
    });

    token
}
