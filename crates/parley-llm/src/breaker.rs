//! Circuit breaker around the upstream chat API.
//!
//! Closed → Open after a run of consecutive failures; Open → HalfOpen
//! once the recovery period elapses; a HalfOpen probe closes the breaker
//! on success and reopens it on failure.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::errors::GenerationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

/// Consecutive-failure circuit breaker.
pub struct CircuitBreaker {
    state: Mutex<State>,
    failure_threshold: u32,
    recovery: Duration,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    #[must_use]
    pub fn new(failure_threshold: u32, recovery: Duration) -> Self {
        Self {
            state: Mutex::new(State::Closed {
                consecutive_failures: 0,
            }),
            failure_threshold,
            recovery,
        }
    }

    /// Check whether a request may proceed.
    ///
    /// An open breaker whose recovery period has elapsed moves to
    /// half-open and admits the caller as the probe.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::CircuitOpen`] while the breaker is open.
    pub fn check(&self) -> Result<(), GenerationError> {
        let mut state = self.state.lock();
        match *state {
            State::Closed { .. } | State::HalfOpen => Ok(()),
            State::Open { opened_at } => {
                let elapsed = opened_at.elapsed();
                if elapsed >= self.recovery {
                    info!("circuit breaker half-open, admitting probe request");
                    *state = State::HalfOpen;
                    Ok(())
                } else {
                    Err(GenerationError::CircuitOpen {
                        retry_after_secs: (self.recovery - elapsed).as_secs().max(1),
                    })
                }
            }
        }
    }

    /// Record a successful request, closing the breaker.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, State::Closed { consecutive_failures: 0 }) {
            *state = State::Closed {
                consecutive_failures: 0,
            };
        }
    }

    /// Record a failed request.
    ///
    /// Reaching the threshold, or failing the half-open probe, opens the
    /// breaker.
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        match *state {
            State::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= self.failure_threshold {
                    warn!(failures, "circuit breaker opened");
                    metrics::counter!("llm_breaker_opened_total").increment(1);
                    *state = State::Open {
                        opened_at: Instant::now(),
                    };
                } else {
                    *state = State::Closed {
                        consecutive_failures: failures,
                    };
                }
            }
            State::HalfOpen => {
                warn!("circuit breaker probe failed, reopening");
                metrics::counter!("llm_breaker_opened_total").increment(1);
                *state = State::Open {
                    opened_at: Instant::now(),
                };
            }
            State::Open { .. } => {}
        }
    }

    /// Whether the breaker currently rejects requests.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock(), State::Open { opened_at } if opened_at.elapsed() < self.recovery)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
