// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotulo — Batch orchestration: dedup, grouping, delivery, confirmation, logging.

pub mod backoff;
pub mod confirm;
pub mod dedup;
pub mod grouper;
pub mod orchestrator;
pub mod outcome_log;
pub mod source;

pub use confirm::{Confirmer, HttpConfirmer};
pub use dedup::{DedupCache, fingerprint};
pub use grouper::{GroupedBatch, PrinterGroup};
pub use orchestrator::Orchestrator;
pub use outcome_log::OutcomeLog;
pub use source::JobSource;
