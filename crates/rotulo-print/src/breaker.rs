// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Circuit breaker guarding the delivery channels.
//
// After a streak of delivery failures, stop hammering printers that will
// just time out and short-circuit whole batches instead. Once the open
// window passes, let a single trial batch through; its outcome decides
// whether the circuit closes again.

use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Consecutive failures that trip the breaker.
const FAILURE_THRESHOLD: u32 = 3;

/// How long an open breaker blocks dispatch before allowing a trial.
const OPEN_WINDOW: Duration = Duration::from_secs(30);

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation, deliveries pass through.
    Closed,
    /// Too many failures, dispatch is short-circuited.
    Open,
    /// Window passed, one trial dispatch is in flight.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        })
    }
}

/// Single process-wide circuit breaker.
///
/// One instance gates every printer: a failure streak anywhere suspends
/// dispatch everywhere until the window passes.
// TODO: per-routing-key breaker map so one dead printer cannot suspend
// the healthy ones.
pub struct CircuitBreaker {
    state: CircuitState,
    failures: u32,
    last_failure: Option<Instant>,
    window: Duration,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::with_window(OPEN_WINDOW)
    }

    /// Breaker with a custom open window (shortened in tests).
    pub fn with_window(window: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            failures: 0,
            last_failure: None,
            window,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Whether dispatch should be short-circuited right now.
    ///
    /// Advances OPEN to HALF_OPEN once the window has elapsed since the
    /// last failure, so the caller that sees `false` next carries the
    /// trial delivery.
    pub fn is_open(&mut self) -> bool {
        match self.state {
            CircuitState::Closed | CircuitState::HalfOpen => false,
            CircuitState::Open => match self.last_failure {
                Some(at) if at.elapsed() >= self.window => {
                    info!("circuit breaker window passed, allowing a trial dispatch");
                    self.state = CircuitState::HalfOpen;
                    false
                }
                Some(_) => true,
                // no failure timestamp to wait on
                None => {
                    self.state = CircuitState::Closed;
                    false
                }
            },
        }
    }

    /// Feed one delivery outcome into the breaker.
    pub fn record(&mut self, success: bool) {
        if success {
            self.failures = 0;
            if self.state == CircuitState::HalfOpen {
                info!("trial delivery succeeded, closing circuit breaker");
                self.state = CircuitState::Closed;
            }
            return;
        }

        self.failures += 1;
        self.last_failure = Some(Instant::now());
        match self.state {
            CircuitState::Closed if self.failures >= FAILURE_THRESHOLD => {
                warn!(
                    failures = self.failures,
                    "opening circuit breaker after repeated delivery failures"
                );
                self.state = CircuitState::Open;
            }
            CircuitState::HalfOpen => {
                warn!("trial delivery failed, reopening circuit breaker");
                self.state = CircuitState::Open;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_three_consecutive_failures() {
        let mut breaker = CircuitBreaker::new();
        breaker.record(false);
        breaker.record(false);
        assert!(!breaker.is_open());

        breaker.record(false);
        assert!(breaker.is_open());
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn success_resets_the_failure_count() {
        let mut breaker = CircuitBreaker::new();
        breaker.record(false);
        breaker.record(false);
        breaker.record(true);
        breaker.record(false);
        breaker.record(false);
        assert!(!breaker.is_open());
        assert_eq!(breaker.consecutive_failures(), 2);
    }

    #[test]
    fn stays_open_until_the_window_elapses() {
        let mut breaker = CircuitBreaker::with_window(Duration::from_secs(3600));
        for _ in 0..3 {
            breaker.record(false);
        }
        assert!(breaker.is_open());
        assert!(breaker.is_open());
    }

    #[test]
    fn window_elapse_allows_one_trial_then_failure_reopens() {
        let mut breaker = CircuitBreaker::with_window(Duration::from_millis(20));
        for _ in 0..3 {
            breaker.record(false);
        }
        assert!(breaker.is_open());

        std::thread::sleep(Duration::from_millis(30));
        assert!(!breaker.is_open());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record(false);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.is_open());
        // the count kept growing across the trial
        assert_eq!(breaker.consecutive_failures(), 4);
    }

    #[test]
    fn trial_success_closes_the_circuit() {
        let mut breaker = CircuitBreaker::with_window(Duration::from_millis(20));
        for _ in 0..3 {
            breaker.record(false);
        }
        std::thread::sleep(Duration::from_millis(30));
        assert!(!breaker.is_open());

        breaker.record(true);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
        assert!(!breaker.is_open());
    }

    #[test]
    fn state_displays_in_log_format() {
        assert_eq!(CircuitState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
    }
}
