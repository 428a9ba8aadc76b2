// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dispatch counters and the time-to-print sample ring.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Most recent delivery timings kept for the p95 figure.
const TTI_SAMPLE_CAP: usize = 100;

/// Process-wide dispatch counters, shared via `Arc`.
#[derive(Debug, Default)]
pub struct DispatchStats {
    processed: AtomicU64,
    failures: AtomicU64,
    tti_ms: Mutex<VecDeque<u64>>,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count jobs that made it onto a printer.
    pub fn add_processed(&self, n: u64) {
        self.processed.fetch_add(n, Ordering::Relaxed);
    }

    /// Count one failed printer group (both channels down).
    pub fn add_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one successful delivery's elapsed time. The ring keeps only
    /// the most recent samples; old ones fall off the front.
    pub fn record_tti(&self, elapsed: Duration) {
        let mut ring = self.tti_ms.lock().expect("tti ring lock poisoned");
        if ring.len() >= TTI_SAMPLE_CAP {
            ring.pop_front();
        }
        ring.push_back(elapsed.as_millis() as u64);
    }

    /// 95th-percentile time-to-print in milliseconds, 0 with no samples.
    pub fn p95_tti_ms(&self) -> u64 {
        let ring = self.tti_ms.lock().expect("tti ring lock poisoned");
        if ring.is_empty() {
            return 0;
        }
        let mut sorted: Vec<u64> = ring.iter().copied().collect();
        sorted.sort_unstable();
        let idx = ((sorted.len() as f64) * 0.95).floor() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            p95_tti_ms: self.p95_tti_ms(),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub failures: u64,
    pub p95_tti_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p95_is_zero_without_samples() {
        let stats = DispatchStats::new();
        assert_eq!(stats.p95_tti_ms(), 0);
    }

    #[test]
    fn p95_picks_the_high_end() {
        let stats = DispatchStats::new();
        for ms in [10u64, 20, 30, 40, 50, 60, 70, 80, 90, 1000] {
            stats.record_tti(Duration::from_millis(ms));
        }
        assert_eq!(stats.p95_tti_ms(), 1000);
    }

    #[test]
    fn ring_drops_oldest_beyond_cap() {
        let stats = DispatchStats::new();
        // 150 slow samples, then 100 fast ones push them all out
        for _ in 0..150 {
            stats.record_tti(Duration::from_millis(5000));
        }
        for _ in 0..100 {
            stats.record_tti(Duration::from_millis(10));
        }
        assert_eq!(stats.p95_tti_ms(), 10);
    }

    #[test]
    fn snapshot_reflects_counters() {
        let stats = DispatchStats::new();
        stats.add_processed(7);
        stats.add_processed(3);
        stats.add_failure();
        let snap = stats.snapshot();
        assert_eq!(snap.processed, 10);
        assert_eq!(snap.failures, 1);
    }
}
