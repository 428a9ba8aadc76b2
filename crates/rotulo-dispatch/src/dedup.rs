// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job fingerprinting and the duplicate-suppression window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use rotulo_core::LabelJob;

/// How long an already-printed fingerprint keeps suppressing re-prints.
pub const DEDUP_TTL: Duration = Duration::from_secs(15 * 60);

/// Deterministic key over the fields that make a job distinct work:
/// routing key, item id, copy count, and product name. Everything else
/// (timestamps, company block) may differ between retransmissions of the
/// same logical request.
pub fn fingerprint(job: &LabelJob) -> String {
    let critical = format!(
        "{}|{}|{}|{}",
        job.store_key.as_deref().unwrap_or_default(),
        job.id_produto.as_deref().unwrap_or_default(),
        job.etiquetas,
        job.field_str("nome"),
    );
    hex::encode(Sha256::digest(critical.as_bytes()))
}

/// Fixed-window duplicate suppression.
///
/// Upstream re-sends batches on flaky links; a fingerprint seen inside
/// the window is dropped rather than printed twice.
pub struct DedupCache {
    ttl: Duration,
    entries: HashMap<String, Instant>,
    duplicates: u64,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::with_ttl(DEDUP_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            duplicates: 0,
        }
    }

    /// Sweeps expired entries, then tests and marks in one step. Returns
    /// true when the key was already inside the window; a hit does not
    /// refresh the original timestamp, so suppression always ends TTL
    /// after the first print.
    pub fn check_and_mark(&mut self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .retain(|_, stamp| now.duration_since(*stamp) <= self.ttl);

        if self.entries.contains_key(key) {
            self.duplicates += 1;
            return true;
        }
        self.entries.insert(key.to_string(), now);
        false
    }

    /// Running count of suppressed jobs.
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}
