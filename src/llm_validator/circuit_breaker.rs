/**
 * CircuitBreaker (§4.4, GLOSSARY "Circuit breaker")
 *
 * DESIGN DECISION: Three-state machine (closed / open / half-open) guarded by a single
 * `Mutex`, the way `aka-1976-Axiom-Protocol::guardian_enhancement`'s
 * `EmergencyCircuitBreaker` holds its state through an entire decision rather than
 * releasing the lock between the read and the write
 * WHY: A check-then-act race between two callers ("is it open?" then "trip it") would
 * let both through during the window; holding the lock for the full decision closes
 * that race
 *
 * PATTERN: generalized from the teacher's `EmergencyCircuitBreaker`, replacing its
 * fixed 24h auto-recovery with the half-open/probe cycle GLOSSARY calls for
 */

use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Opens after `failure_threshold` consecutive failures. Once open, rejects calls for
/// `cool_down` before allowing a single half-open probe through. One successful probe
/// closes the breaker; a failed probe reopens it and restarts the cool-down.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cool_down: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cool_down: Duration) -> Self {
        Self {
            failure_threshold,
            cool_down,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// True if a call should be allowed through right now. Transitions open -> half-open
    /// itself when the cool-down has elapsed, so callers don't need to poll separately.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            State::Closed => true,
            State::HalfOpen => false,
            State::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.cool_down {
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
            }
            State::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    tracing::warn!(
                        threshold = self.failure_threshold,
                        "LLM adjudicator circuit breaker tripped open"
                    );
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            State::Open => {}
        }
    }

    pub fn is_open(&self) -> bool {
        let inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.state == State::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_allows_requests() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(breaker.allow_request());
    }

    #[test]
    fn opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert!(!breaker.allow_request());
        assert!(breaker.is_open());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.allow_request());
    }

    #[test]
    fn half_open_probe_closes_breaker_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        assert!(!breaker.allow_request());
        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.allow_request(), "cool-down elapsed, probe should be allowed");
        breaker.record_success();
        assert!(!breaker.is_open());
        assert!(breaker.allow_request());
    }

    #[test]
    fn failed_probe_reopens_and_restarts_cool_down() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(!breaker.allow_request());
    }
}
