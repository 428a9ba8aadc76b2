// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Partitions a batch by target printer, applying routing and dedup checks.

use std::collections::HashMap;

use tracing::{info, warn};

use rotulo_core::{DropReason, JobResult, LabelJob, PrinterRecord};

use crate::dedup::{DedupCache, fingerprint};

/// Jobs bound for one physical printer, delivered as a single payload.
#[derive(Debug, Clone)]
pub struct PrinterGroup {
    pub printer: PrinterRecord,
    pub jobs: Vec<LabelJob>,
}

/// Outcome of grouping: surviving groups in first-appearance order, plus
/// one drop record per job that never made it to a group.
#[derive(Debug, Default)]
pub struct GroupedBatch {
    pub groups: Vec<PrinterGroup>,
    pub dropped: Vec<JobResult>,
}

/// Walks the batch in input order. Each job either joins a group or
/// produces exactly one drop record.
///
/// The group key is (routing key, resolved printer name), not the routing
/// key alone: a directory reload mid-stream could remap a key to another
/// printer, and the pair keeps payloads from mixing across that boundary.
pub fn group_jobs(
    jobs: Vec<LabelJob>,
    directory: &HashMap<String, PrinterRecord>,
    dedup: &mut DedupCache,
) -> GroupedBatch {
    let mut groups: Vec<PrinterGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut dropped = Vec::new();

    for job in jobs {
        if !job.is_dispatchable() {
            warn!(job = %job.display_id(), "job missing routing fields dropped");
            dropped.push(JobResult::dropped(&job, DropReason::MissingRoutingFields));
            continue;
        }
        // is_dispatchable guarantees a non-empty routing key
        let store_key = job.store_key.clone().unwrap_or_default();

        let Some(printer) = directory.get(&store_key) else {
            warn!(store_key, "no printer configured for routing key");
            dropped.push(JobResult::dropped(&job, DropReason::UnknownPrinter));
            continue;
        };
        if !printer.ativo {
            warn!(store_key, printer = %printer.nome, "printer inactive, job dropped");
            dropped.push(JobResult::dropped(&job, DropReason::InactivePrinter));
            continue;
        }
        if dedup.check_and_mark(&fingerprint(&job)) {
            info!(job = %job.display_id(), "duplicate job suppressed");
            dropped.push(JobResult::dropped(&job, DropReason::Duplicate));
            continue;
        }

        let key = format!("{store_key}-{}", printer.nome);
        let idx = *index.entry(key).or_insert_with(|| {
            groups.push(PrinterGroup {
                printer: printer.clone(),
                jobs: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].jobs.push(job);
    }

    GroupedBatch { groups, dropped }
}
