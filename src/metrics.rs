/**
 * Metrics (§4.10 `Metrics() -> snapshot`, §6 "optional metrics export file ... newline-delimited JSON")
 *
 * DESIGN DECISION: Plain `AtomicU64` counters rather than routing every increment
 * through the engine-scoped lock
 * WHY: Metrics increments happen on every request's hot path; atomics keep that free
 * of contention with PatternStore/BehaviorStore mutation, while `Snapshot` still
 * gives callers a consistent-enough point-in-time view for health checks and export
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub blocked_total: u64,
    pub cache_hits: u64,
    pub llm_breaker_trips: u64,
    pub errors_total: u64,
}

#[derive(Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    blocked_total: AtomicU64,
    cache_hits: AtomicU64,
    llm_breaker_trips: AtomicU64,
    errors_total: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, blocked: bool, from_cache: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if blocked {
            self.blocked_total.fetch_add(1, Ordering::Relaxed);
        }
        if from_cache {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_breaker_trip(&self) {
        self.llm_breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            blocked_total: self.blocked_total.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            llm_breaker_trips: self.llm_breaker_trips.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
        }
    }

    /// Append the current snapshot as one newline-delimited JSON line (§6 persistence).
    pub fn export_line(&self) -> crate::error::Result<String> {
        let mut line = serde_json::to_string(&self.snapshot())?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_request(true, false);
        metrics.record_request(false, true);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.blocked_total, 1);
        assert_eq!(snapshot.cache_hits, 1);
    }

    #[test]
    fn export_line_is_valid_json_with_trailing_newline() {
        let metrics = Metrics::new();
        metrics.record_request(false, false);
        let line = metrics.export_line().unwrap();
        assert!(line.ends_with('\n'));
        let parsed: MetricsSnapshot = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed.requests_total, 1);
    }
}
