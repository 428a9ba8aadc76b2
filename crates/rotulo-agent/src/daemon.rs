// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The poll loop: fetch a batch, dispatch it, repeat.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use rotulo_core::RotuloError;
use rotulo_dispatch::backoff::{POLL_IDLE_DELAY, POLL_SUSPEND_DELAY, jitter, poll_error_delay};
use rotulo_dispatch::{Confirmer, JobSource, Orchestrator};
use rotulo_print::DeliveryChannel;

const GATE_MAX_FAILURES: u32 = 3;
const GATE_RETRY_WINDOW: Duration = Duration::from_secs(30);

/// Transport-level gate on the poll loop, separate from the dispatch
/// breaker: after three consecutive poll failures the loop stops hitting
/// the source until the retry window passes.
struct PollGate {
    failures: u32,
    last_failure: Option<Instant>,
    window: Duration,
}

impl PollGate {
    fn new() -> Self {
        Self {
            failures: 0,
            last_failure: None,
            window: GATE_RETRY_WINDOW,
        }
    }

    #[cfg(test)]
    fn with_window(window: Duration) -> Self {
        Self {
            failures: 0,
            last_failure: None,
            window,
        }
    }

    fn record_success(&mut self) {
        self.failures = 0;
    }

    fn record_failure(&mut self) {
        self.failures += 1;
        self.last_failure = Some(Instant::now());
    }

    fn failures(&self) -> u32 {
        self.failures
    }

    /// True while the gate is holding polls back. Once the window has
    /// passed the gate resets itself and lets the next poll through.
    fn suspended(&mut self) -> bool {
        if self.failures < GATE_MAX_FAILURES {
            return false;
        }
        match self.last_failure {
            Some(at) if at.elapsed() < self.window => true,
            _ => {
                info!("poll gate reset, reconnecting to job source");
                self.failures = 0;
                false
            }
        }
    }
}

/// Runs until the shutdown token fires. The token is only checked
/// between cycles, so an in-flight batch always runs to completion.
pub async fn run<D, C>(
    source: JobSource,
    orchestrator: Arc<Orchestrator<D, C>>,
    shutdown: CancellationToken,
) where
    D: DeliveryChannel,
    C: Confirmer,
{
    info!("dispatch daemon started");
    let mut gate = PollGate::new();

    while !shutdown.is_cancelled() {
        if gate.suspended() {
            sleep_or_shutdown(jitter(POLL_SUSPEND_DELAY), &shutdown).await;
            continue;
        }

        match source.fetch().await {
            Ok(jobs) if jobs.is_empty() => {
                sleep_or_shutdown(jitter(POLL_IDLE_DELAY), &shutdown).await;
            }
            Ok(jobs) => {
                info!(jobs = jobs.len(), "batch received");
                gate.record_success();
                let started = Instant::now();
                match orchestrator.dispatch(jobs).await {
                    Ok(results) => {
                        debug!(
                            results = results.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "batch complete"
                        );
                    }
                    Err(RotuloError::BreakerOpen) => {
                        warn!("dispatch suspended by circuit breaker");
                        sleep_or_shutdown(jitter(POLL_SUSPEND_DELAY), &shutdown).await;
                    }
                    Err(RotuloError::Busy) => {
                        // a single poll loop should never overlap itself
                        warn!("dispatch already running, batch skipped");
                    }
                    Err(e) => error!(error = %e, "dispatch failed"),
                }
            }
            Err(RotuloError::SourceTimeout) => {
                debug!("long-poll cycle expired without work");
            }
            Err(RotuloError::MalformedBatch(msg)) => {
                // a bad payload is the source talking, not the transport
                // failing, so the gate stays untouched
                warn!(detail = %msg, "job source sent a malformed batch");
                sleep_or_shutdown(jitter(POLL_IDLE_DELAY), &shutdown).await;
            }
            Err(e) => {
                gate.record_failure();
                error!(
                    error = %e,
                    failures = gate.failures(),
                    "poll failed"
                );
                sleep_or_shutdown(jitter(poll_error_delay(gate.failures())), &shutdown).await;
            }
        }
    }
    info!("dispatch daemon stopped");
}

async fn sleep_or_shutdown(delay: Duration, shutdown: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = shutdown.cancelled() => {}
    }
}
