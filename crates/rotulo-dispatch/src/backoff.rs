// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Jittered delays shared by the confirmation notifier and the poll loop.

use std::time::Duration;

use rand::Rng;

const JITTER_VARIANCE: f64 = 0.3;

/// Base delay between confirmation attempts, doubled per attempt.
pub const CONFIRM_BASE_DELAY: Duration = Duration::from_millis(500);

/// Poll-loop sleep after an empty cycle.
pub const POLL_IDLE_DELAY: Duration = Duration::from_secs(2);

/// Poll-loop sleep while dispatch is suspended (breaker open or the poll
/// failure gate engaged).
pub const POLL_SUSPEND_DELAY: Duration = Duration::from_secs(5);

/// Ceiling for the poll error backoff.
const POLL_ERROR_CAP: Duration = Duration::from_secs(10);

/// Spreads a delay by ±30% so a fleet of agents restarted together does
/// not fall into lockstep against the job source.
pub fn jitter(base: Duration) -> Duration {
    let factor = 1.0 + rand::rng().random_range(-JITTER_VARIANCE..=JITTER_VARIANCE);
    base.mul_f64(factor)
}

/// Delay before retrying the confirmation sink after `attempt` failed
/// (attempts are 1-based): 500ms, 1s, 2s... with jitter.
pub fn confirm_delay(attempt: u32) -> Duration {
    jitter(CONFIRM_BASE_DELAY * 2u32.pow(attempt.saturating_sub(1)))
}

/// Poll-loop delay after `failures` consecutive transport errors:
/// 1s, 2s, 4s, 8s, capped at 10s, with jitter.
pub fn poll_error_delay(failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(4);
    let base = Duration::from_secs(1u64 << exp);
    jitter(base.min(POLL_ERROR_CAP))
}
