//! Aggregate counter properties under sequential and concurrent load.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use reqtrace_core::MetricsAggregator;

#[test]
fn counts_match_inputs() {
    let m = MetricsAggregator::new();
    let samples: Vec<(f64, bool)> = (0..500)
        .map(|i| ((i % 37) as f64 * 1.5, i % 7 == 0))
        .collect();

    for (d, e) in &samples {
        m.record_request(*d, *e);
    }

    let s = m.snapshot();
    let sum: f64 = samples.iter().map(|(d, _)| d).sum();
    assert_eq!(s.total_requests, samples.len() as u64);
    assert_eq!(s.errors, samples.iter().filter(|(_, e)| *e).count() as u64);
    assert!(s.errors <= s.total_requests);
    assert!((s.avg_duration_ms - sum / samples.len() as f64).abs() < 1e-9);
}

#[test]
fn scenario_three_ok_one_error() {
    let m = MetricsAggregator::new();
    m.record_request(50.0, false);
    m.record_request(50.0, false);
    m.record_request(50.0, false);
    m.record_request(120.0, true);

    let s = m.snapshot();
    assert_eq!(s.total_requests, 4);
    assert_eq!(s.errors, 1);
    assert_eq!(s.avg_duration_ms, 67.5);
}

#[test]
fn concurrent_producers_lose_nothing() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 2_000;

    let m = Arc::new(MetricsAggregator::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    m.record_request(2.0, (t + i) % 4 == 0);
                    m.record_route("GET", "/", 200);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("producer panicked");
    }

    let s = m.snapshot();
    let expected_errors = (0..THREADS)
        .flat_map(|t| (0..PER_THREAD).map(move |i| (t + i) % 4 == 0))
        .filter(|e| *e)
        .count() as u64;

    assert_eq!(s.total_requests, (THREADS * PER_THREAD) as u64);
    assert_eq!(s.errors, expected_errors);
    assert_eq!(s.duration_sum_ms, 2.0 * (THREADS * PER_THREAD) as f64);
    assert_eq!(s.routes[0].count, (THREADS * PER_THREAD) as u64);
}

#[test]
fn snapshots_taken_during_writes_stay_consistent() {
    let m = Arc::new(MetricsAggregator::new());
    let writer = {
        let m = Arc::clone(&m);
        thread::spawn(move || {
            for _ in 0..20_000 {
                // every write is an error of exactly 1ms
                m.record_request(1.0, true);
            }
        })
    };

    for _ in 0..1_000 {
        let s = m.snapshot();
        assert_eq!(s.errors, s.total_requests);
        assert_eq!(s.duration_sum_ms, s.total_requests as f64);
    }
    writer.join().unwrap();
}

#[test]
fn reset_isolates_runs() {
    let m = MetricsAggregator::new();
    m.record_request(10.0, true);
    m.reset();
    m.record_request(4.0, false);

    let s = m.snapshot();
    assert_eq!(s.total_requests, 1);
    assert_eq!(s.errors, 0);
    assert_eq!(s.avg_duration_ms, 4.0);
}
