// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent health snapshot, logged periodically for fleet monitoring.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rotulo_core::DispatchStats;
use rotulo_dispatch::{Confirmer, Orchestrator};
use rotulo_print::DeliveryChannel;

const HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// Point-in-time view of the agent, assembled from the orchestrator and
/// the shared counters.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub breaker_state: String,
    pub busy: bool,
    pub processed: u64,
    pub duplicates: u64,
    pub failures: u64,
    pub p95_tti_ms: u64,
}

impl HealthReport {
    pub fn assemble<D: DeliveryChannel, C: Confirmer>(
        orchestrator: &Orchestrator<D, C>,
        stats: &DispatchStats,
        started: Instant,
    ) -> Self {
        let snapshot = stats.snapshot();
        Self {
            status: "ok",
            uptime_seconds: started.elapsed().as_secs(),
            breaker_state: orchestrator.breaker_state().to_string(),
            busy: orchestrator.is_running(),
            processed: snapshot.processed,
            duplicates: orchestrator.duplicates(),
            failures: snapshot.failures,
            p95_tti_ms: snapshot.p95_tti_ms,
        }
    }
}

/// Logs a health report every 30s until shutdown.
pub fn spawn_reporter<D, C>(
    orchestrator: Arc<Orchestrator<D, C>>,
    stats: Arc<DispatchStats>,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    D: DeliveryChannel + 'static,
    C: Confirmer + 'static,
{
    let started = Instant::now();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEALTH_INTERVAL) => {
                    let report = HealthReport::assemble(&orchestrator, &stats, started);
                    match serde_json::to_string(&report) {
                        Ok(json) => debug!(health = %json, "health report"),
                        Err(e) => warn!(error = %e, "health report serialization failed"),
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }
    })
}
