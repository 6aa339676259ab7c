//! Engine-side metrics for observability.
//!
//! This module provides a pluggable metrics trait (`EngineMetrics`) that
//! embedders can implement to collect telemetry from a list session. Two
//! implementations are included:
//!
//! - [`NoopEngineMetrics`]: Zero-overhead default that discards all metrics.
//! - [`MetricsEngineMetrics`]: Integration with the [`metrics`](https://docs.rs/metrics) crate
//!   facade, forwarding to whatever recorder is installed (Prometheus, StatsD, etc.).
//!
//! # Metric Names
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `tracklist_fetch_total` | Counter | `phase`, `status` | Committed or failed fetches |
//! | `tracklist_fetch_duration_seconds` | Histogram | `phase` | Fetch latency |
//! | `tracklist_stale_responses_total` | Counter | `phase` | Responses discarded as superseded |
//! | `tracklist_count_failures_total` | Counter | | Swallowed count-query failures |
//! | `tracklist_votes_total` | Counter | `outcome` | Vote toggles by outcome |

use std::{fmt, sync::Arc, time::Duration};

use crate::error::FetchPhase;

/// Trait for engine-side metrics collection.
///
/// All methods have default no-op implementations, so only the metrics of
/// interest need overriding.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` since a single instance is shared
/// by every clone of a session and by its background debounce tasks.
pub trait EngineMetrics: Send + Sync + fmt::Debug {
    /// Records a fetch whose result reached the accumulator (success or failure).
    fn record_fetch(&self, phase: FetchPhase, duration: Duration, success: bool) {
        let _ = (phase, duration, success);
    }

    /// Records a response discarded because a newer fetch superseded it.
    fn record_stale(&self, phase: FetchPhase) {
        let _ = phase;
    }

    /// Records a count-query failure that was swallowed.
    fn record_count_failure(&self) {}

    /// Records the outcome of a vote toggle (`applied`, `rolled_back`, `in_flight`, ...).
    fn record_vote(&self, outcome: &str) {
        let _ = outcome;
    }
}

/// No-op metrics implementation with zero overhead.
#[derive(Debug, Clone, Copy)]
pub struct NoopEngineMetrics;

impl EngineMetrics for NoopEngineMetrics {}

/// Metrics implementation using the [`metrics`](https://docs.rs/metrics) crate facade.
///
/// All metric names use the `tracklist_` prefix.
#[derive(Debug, Clone, Copy)]
pub struct MetricsEngineMetrics;

/// Metric name constants for the `metrics` crate facade.
mod metric_names {
    /// Fetches by phase and outcome.
    pub const FETCH_TOTAL: &str = "tracklist_fetch_total";
    /// Fetch duration distribution.
    pub const FETCH_DURATION: &str = "tracklist_fetch_duration_seconds";
    /// Superseded responses.
    pub const STALE_TOTAL: &str = "tracklist_stale_responses_total";
    /// Swallowed count failures.
    pub const COUNT_FAILURES_TOTAL: &str = "tracklist_count_failures_total";
    /// Vote toggles by outcome.
    pub const VOTES_TOTAL: &str = "tracklist_votes_total";
}

impl EngineMetrics for MetricsEngineMetrics {
    fn record_fetch(&self, phase: FetchPhase, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        metrics::counter!(metric_names::FETCH_TOTAL, "phase" => phase.to_string(), "status" => status)
            .increment(1);
        metrics::histogram!(metric_names::FETCH_DURATION, "phase" => phase.to_string())
            .record(duration.as_secs_f64());
    }

    fn record_stale(&self, phase: FetchPhase) {
        metrics::counter!(metric_names::STALE_TOTAL, "phase" => phase.to_string()).increment(1);
    }

    fn record_count_failure(&self) {
        metrics::counter!(metric_names::COUNT_FAILURES_TOTAL).increment(1);
    }

    fn record_vote(&self, outcome: &str) {
        metrics::counter!(metric_names::VOTES_TOTAL, "outcome" => outcome.to_owned()).increment(1);
    }
}

/// Creates the default metrics instance (no-op).
pub(crate) fn default_metrics() -> Arc<dyn EngineMetrics> {
    Arc::new(NoopEngineMetrics)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    /// Counts calls for verification.
    #[derive(Debug, Default)]
    struct CountingMetrics {
        fetches: AtomicU64,
        stale: AtomicU64,
        votes: AtomicU64,
    }

    impl EngineMetrics for CountingMetrics {
        fn record_fetch(&self, _phase: FetchPhase, _duration: Duration, _success: bool) {
            self.fetches.fetch_add(1, Ordering::Relaxed);
        }
        fn record_stale(&self, _phase: FetchPhase) {
            self.stale.fetch_add(1, Ordering::Relaxed);
        }
        fn record_vote(&self, _outcome: &str) {
            self.votes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn noop_is_default() {
        let metrics = default_metrics();
        metrics.record_fetch(FetchPhase::Reset, Duration::from_millis(1), true);
        metrics.record_count_failure();
    }

    #[test]
    fn trait_object_via_arc() {
        let counting = Arc::new(CountingMetrics::default());
        let metrics: Arc<dyn EngineMetrics> = counting.clone();

        metrics.record_fetch(FetchPhase::Append, Duration::from_millis(5), false);
        metrics.record_stale(FetchPhase::Reset);
        metrics.record_vote("applied");
        metrics.record_count_failure();

        assert_eq!(counting.fetches.load(Ordering::Relaxed), 1);
        assert_eq!(counting.stale.load(Ordering::Relaxed), 1);
        assert_eq!(counting.votes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn metrics_facade_does_not_panic_without_recorder() {
        let metrics = MetricsEngineMetrics;
        metrics.record_fetch(FetchPhase::Reset, Duration::from_millis(5), true);
        metrics.record_stale(FetchPhase::Count);
        metrics.record_count_failure();
        metrics.record_vote("rolled_back");
    }

    #[test]
    fn metrics_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoopEngineMetrics>();
        assert_send_sync::<MetricsEngineMetrics>();
        assert_send_sync::<Arc<dyn EngineMetrics>>();
    }
}
