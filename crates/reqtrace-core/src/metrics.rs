//! Aggregate request counters.
//!
//! The headline counters (requests, errors, duration sum, latency buckets) live
//! behind a single mutex so a snapshot never mixes fields from two different
//! `record_request` calls. Critical sections are a handful of integer adds.
//! Per-route counters are keyed in a `DashMap` like a labelled counter vector;
//! they are informational and not part of the consistent snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use serde::Serialize;

/// Upper bounds (inclusive, milliseconds) of the cumulative latency buckets.
pub const LATENCY_BUCKETS_MS: [f64; 11] = [
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0,
];

#[derive(Debug, Default, Clone)]
struct Counters {
    requests: u64,
    errors: u64,
    duration_sum_ms: f64,
    buckets: [u64; LATENCY_BUCKETS_MS.len()],
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct RouteKey {
    method: String,
    path: String,
    status: u16,
}

/// Count of completed requests for one (method, path, status) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteCount {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub count: u64,
}

/// Consistent, immutable read of the aggregate counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub errors: u64,
    pub duration_sum_ms: f64,
    /// `duration_sum_ms / total_requests`, or 0 with no requests.
    pub avg_duration_ms: f64,
    /// Cumulative counts, parallel to [`LATENCY_BUCKETS_MS`].
    pub latency_buckets: Vec<u64>,
    pub sink_failures: u64,
    /// Sorted by (method, path, status).
    pub routes: Vec<RouteCount>,
}

impl MetricsSnapshot {
    /// Snapshot of a freshly created aggregator.
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            errors: 0,
            duration_sum_ms: 0.0,
            avg_duration_ms: 0.0,
            latency_buckets: vec![0; LATENCY_BUCKETS_MS.len()],
            sink_failures: 0,
            routes: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MetricsAggregator {
    counters: Mutex<Counters>,
    routes: DashMap<RouteKey, AtomicU64>,
    sink_failures: AtomicU64,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed request.
    ///
    /// Negative, NaN and infinite durations are clamped to zero so a bad clock
    /// reading can never push the sum backwards. The sum saturates at
    /// `f64::MAX`.
    pub fn record_request(&self, duration_ms: f64, is_error: bool) {
        let duration_ms = clamp_duration(duration_ms);
        let mut c = self.lock();
        c.requests += 1;
        if is_error {
            c.errors += 1;
        }
        c.duration_sum_ms = (c.duration_sum_ms + duration_ms).min(f64::MAX);

        // Cumulative: every bucket whose bound covers the value.
        for (i, &le) in LATENCY_BUCKETS_MS.iter().enumerate() {
            if duration_ms <= le {
                c.buckets[i] += 1;
            }
        }
    }

    /// Bump the per-route counter for a completed request.
    pub fn record_route(&self, method: &str, path: &str, status: u16) {
        let key = RouteKey {
            method: method.to_string(),
            path: path.to_string(),
            status,
        };
        let counter = self.routes.entry(key).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an event-sink failure that the instrumentation swallowed.
    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = self.lock().clone();

        let avg_duration_ms = if c.requests == 0 {
            0.0
        } else {
            c.duration_sum_ms / c.requests as f64
        };

        let mut routes: Vec<RouteCount> = self
            .routes
            .iter()
            .map(|r| RouteCount {
                method: r.key().method.clone(),
                path: r.key().path.clone(),
                status: r.key().status,
                count: r.value().load(Ordering::Relaxed),
            })
            .collect();
        routes.sort_by(|a, b| {
            (&a.method, &a.path, a.status).cmp(&(&b.method, &b.path, b.status))
        });

        MetricsSnapshot {
            total_requests: c.requests,
            errors: c.errors,
            duration_sum_ms: c.duration_sum_ms,
            avg_duration_ms,
            latency_buckets: c.buckets.to_vec(),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            routes,
        }
    }

    /// Zero every counter.
    pub fn reset(&self) {
        *self.lock() = Counters::default();
        self.routes.clear();
        self.sink_failures.store(0, Ordering::Relaxed);
    }

    // A panic while holding the lock cannot leave the counters half-written
    // in a way we care about, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn clamp_duration(ms: f64) -> f64 {
    if ms.is_finite() && ms > 0.0 {
        ms
    } else {
        0.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_zero_average() {
        let m = MetricsAggregator::new();
        let s = m.snapshot();
        assert_eq!(s, MetricsSnapshot::empty());
        assert_eq!(s.avg_duration_ms, 0.0);
    }

    #[test]
    fn mixed_outcomes_average() {
        let m = MetricsAggregator::new();
        for _ in 0..3 {
            m.record_request(50.0, false);
        }
        m.record_request(120.0, true);

        let s = m.snapshot();
        assert_eq!(s.total_requests, 4);
        assert_eq!(s.errors, 1);
        assert_eq!(s.duration_sum_ms, 270.0);
        assert_eq!(s.avg_duration_ms, 67.5);
    }

    #[test]
    fn bad_durations_are_clamped() {
        let m = MetricsAggregator::new();
        m.record_request(-5.0, false);
        m.record_request(f64::NAN, false);
        m.record_request(f64::INFINITY, true);

        let s = m.snapshot();
        assert_eq!(s.total_requests, 3);
        assert_eq!(s.errors, 1);
        assert_eq!(s.duration_sum_ms, 0.0);
        // every clamped sample lands in the smallest bucket
        assert_eq!(s.latency_buckets[0], 3);
    }

    #[test]
    fn huge_durations_saturate_the_sum() {
        let m = MetricsAggregator::new();
        m.record_request(f64::MAX, false);
        m.record_request(f64::MAX, false);

        let s = m.snapshot();
        assert_eq!(s.duration_sum_ms, f64::MAX);
        assert!(s.avg_duration_ms.is_finite());
    }

    #[test]
    fn buckets_are_cumulative() {
        let m = MetricsAggregator::new();
        m.record_request(3.0, false);
        m.record_request(700.0, false);
        m.record_request(9_000.0, false);

        let s = m.snapshot();
        assert_eq!(s.latency_buckets[0], 0); // le=1
        assert_eq!(s.latency_buckets[1], 1); // le=5
        assert_eq!(s.latency_buckets[8], 2); // le=1000
        assert_eq!(s.latency_buckets[10], 2); // le=5000, 9s falls only in +Inf
    }

    #[test]
    fn routes_are_sorted_and_reset_clears_everything() {
        let m = MetricsAggregator::new();
        m.record_route("POST", "/b", 201);
        m.record_route("GET", "/a", 200);
        m.record_route("GET", "/a", 200);
        m.record_request(1.0, false);
        m.record_sink_failure();

        let s = m.snapshot();
        assert_eq!(s.routes.len(), 2);
        assert_eq!(s.routes[0].method, "GET");
        assert_eq!(s.routes[0].count, 2);
        assert_eq!(s.sink_failures, 1);

        m.reset();
        assert_eq!(m.snapshot(), MetricsSnapshot::empty());
    }
}
