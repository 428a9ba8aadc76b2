// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch dispatch: group, render, deliver, confirm, record.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{error, info, warn};
use uuid::Uuid;

use rotulo_core::error::{Result, RotuloError};
use rotulo_core::{DispatchStats, JobResult, LabelJob};
use rotulo_document::render_batch;
use rotulo_print::CircuitState;
use rotulo_print::breaker::CircuitBreaker;
use rotulo_print::delivery::DeliveryChannel;
use rotulo_print::directory::PrinterDirectory;

use crate::confirm::Confirmer;
use crate::dedup::DedupCache;
use crate::grouper::{GroupedBatch, PrinterGroup, group_jobs};
use crate::outcome_log::{OutcomeLog, OutcomeRecord};

/// Runs one batch at a time through the full pipeline.
///
/// The delivery channel and confirmer are injected so batch semantics can
/// be tested without printers or a network. Groups are processed
/// sequentially; a failed group records its jobs and moves on, it never
/// aborts the rest of the batch.
pub struct Orchestrator<D, C> {
    delivery: D,
    confirmer: C,
    directory: Arc<PrinterDirectory>,
    outcome_log: OutcomeLog,
    stats: Arc<DispatchStats>,
    dedup: Mutex<DedupCache>,
    breaker: Mutex<CircuitBreaker>,
    busy: AtomicBool,
}

/// Clears the busy flag on every exit path out of `dispatch`.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<D: DeliveryChannel, C: Confirmer> Orchestrator<D, C> {
    pub fn new(
        delivery: D,
        confirmer: C,
        directory: Arc<PrinterDirectory>,
        outcome_log: OutcomeLog,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            delivery,
            confirmer,
            directory,
            outcome_log,
            stats,
            dedup: Mutex::new(DedupCache::new()),
            breaker: Mutex::new(CircuitBreaker::new()),
            busy: AtomicBool::new(false),
        }
    }

    /// Dispatches one batch. Returns one result per job: drop records in
    /// input order first, then per-group outcomes as groups complete.
    ///
    /// Rejected outright with [`RotuloError::Busy`] while another batch
    /// is in flight, and with [`RotuloError::BreakerOpen`] while the
    /// breaker is holding deliveries back.
    pub async fn dispatch(&self, jobs: Vec<LabelJob>) -> Result<Vec<JobResult>> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(RotuloError::Busy);
        }
        let _busy = BusyGuard(&self.busy);

        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let incoming = jobs.len();

        if self.breaker.lock().expect("breaker lock poisoned").is_open() {
            warn!(%batch_id, "circuit breaker open, batch rejected");
            return Err(RotuloError::BreakerOpen);
        }

        let snapshot = self.directory.snapshot();
        let GroupedBatch {
            groups,
            dropped: mut results,
        } = {
            let mut dedup = self.dedup.lock().expect("dedup lock poisoned");
            group_jobs(jobs, &snapshot, &mut dedup)
        };

        for group in groups {
            self.process_group(group, &mut results).await;
        }

        info!(
            %batch_id,
            jobs = incoming,
            results = results.len(),
            duplicates = self.duplicates(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch dispatched"
        );
        Ok(results)
    }

    async fn process_group(&self, group: PrinterGroup, results: &mut Vec<JobResult>) {
        let PrinterGroup { printer, jobs } = group;
        let payload = render_batch(&jobs);
        let batch_size = jobs.len();

        info!(printer = %printer.nome, jobs = batch_size, "delivering group");

        // copy multiplication lives in each label's ^PQ directive, so the
        // group payload itself goes out once
        match self.delivery.deliver(&printer, &payload, 1).await {
            Ok(report) => {
                self.record_breaker(true);
                let breaker = self.breaker_state();
                for job in &jobs {
                    let id = job.id_produto.as_deref().unwrap_or_default();
                    let confirmacao = self.confirmer.confirm(id).await;
                    let record = OutcomeRecord::printed(
                        job,
                        &printer,
                        report.mensagem.clone(),
                        confirmacao.clone(),
                        batch_size,
                        breaker,
                    );
                    self.outcome_log.append(&record).await;
                    results.push(JobResult::printed(
                        job,
                        report.mensagem.clone(),
                        Some(confirmacao),
                    ));
                }
                self.stats.add_processed(batch_size as u64);
            }
            Err(e) => {
                self.record_breaker(false);
                let breaker = self.breaker_state();
                let mensagem = e.to_string();
                error!(printer = %printer.nome, error = %mensagem, "group delivery failed");
                for job in &jobs {
                    let record =
                        OutcomeRecord::failed(job, &printer, mensagem.clone(), breaker);
                    self.outcome_log.append(&record).await;
                    results.push(JobResult::failed(job, mensagem.clone()));
                }
            }
        }
    }

    fn record_breaker(&self, success: bool) {
        self.breaker
            .lock()
            .expect("breaker lock poisoned")
            .record(success);
    }

    pub fn breaker_state(&self) -> CircuitState {
        self.breaker.lock().expect("breaker lock poisoned").state()
    }

    pub fn duplicates(&self) -> u64 {
        self.dedup.lock().expect("dedup lock poisoned").duplicates()
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}
