//! In-process counters for orchestrator activity.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, trace};

/// Counters updated by the orchestrator
#[derive(Debug, Default)]
pub struct OrchestratorMetrics {
    sessions_started: AtomicU64,
    sessions_ended: AtomicU64,
    continuations_scheduled: AtomicU64,
    continuations_fired: AtomicU64,
    continuations_discarded: AtomicU64,
    continuations_cancelled: AtomicU64,
    non_fatal_failures: AtomicU64,
    fatal_failures: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub sessions_started: u64,
    pub sessions_ended: u64,
    pub continuations_scheduled: u64,
    pub continuations_fired: u64,
    pub continuations_discarded: u64,
    pub continuations_cancelled: u64,
    pub non_fatal_failures: u64,
    pub fatal_failures: u64,
}

impl MetricsSnapshot {
    /// Sessions started and not yet ended
    pub fn sessions_active(&self) -> u64 {
        self.sessions_started.saturating_sub(self.sessions_ended)
    }
}

impl OrchestratorMetrics {
    /// Create a zeroed set of counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session
    pub fn record_session_started(&self, flow_id: &str) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
        trace!(%flow_id, "metric: session started");
    }

    /// Record session cleanup
    pub fn record_session_ended(&self, reason: &str) {
        self.sessions_ended.fetch_add(1, Ordering::Relaxed);
        trace!(%reason, "metric: session ended");
    }

    /// Record an auto-continuation being armed
    pub fn record_continuation_scheduled(&self) {
        self.continuations_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an auto-continuation that fired and was acted on
    pub fn record_continuation_fired(&self) {
        self.continuations_fired.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an auto-continuation that fired but no longer matched its session
    pub fn record_continuation_discarded(&self) {
        self.continuations_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an auto-continuation cancelled before it fired
    pub fn record_continuation_cancelled(&self) {
        self.continuations_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a best-effort failure that was absorbed
    pub fn record_non_fatal(&self, operation: &str) {
        self.non_fatal_failures.fetch_add(1, Ordering::Relaxed);
        trace!(%operation, "metric: non-fatal failure");
    }

    /// Record a failure propagated to the caller
    pub fn record_fatal(&self, operation: &str) {
        self.fatal_failures.fetch_add(1, Ordering::Relaxed);
        trace!(%operation, "metric: fatal failure");
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_ended: self.sessions_ended.load(Ordering::Relaxed),
            continuations_scheduled: self.continuations_scheduled.load(Ordering::Relaxed),
            continuations_fired: self.continuations_fired.load(Ordering::Relaxed),
            continuations_discarded: self.continuations_discarded.load(Ordering::Relaxed),
            continuations_cancelled: self.continuations_cancelled.load(Ordering::Relaxed),
            non_fatal_failures: self.non_fatal_failures.load(Ordering::Relaxed),
            fatal_failures: self.fatal_failures.load(Ordering::Relaxed),
        }
    }

    /// Log a one-line summary of the counters
    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            sessions_active = s.sessions_active(),
            sessions_started = s.sessions_started,
            continuations_fired = s.continuations_fired,
            continuations_discarded = s.continuations_discarded,
            non_fatal_failures = s.non_fatal_failures,
            fatal_failures = s.fatal_failures,
            "Orchestrator counters"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = OrchestratorMetrics::new();
        metrics.record_session_started("flow-1");
        metrics.record_session_started("flow-1");
        metrics.record_session_ended("completed");
        metrics.record_continuation_scheduled();
        metrics.record_continuation_discarded();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.sessions_started, 2);
        assert_eq!(snapshot.sessions_ended, 1);
        assert_eq!(snapshot.sessions_active(), 1);
        assert_eq!(snapshot.continuations_scheduled, 1);
        assert_eq!(snapshot.continuations_discarded, 1);
        assert_eq!(snapshot.continuations_fired, 0);
    }
}
