//! Ring buffer bound and FIFO eviction.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use chrono::Utc;
use reqtrace_core::{TraceRecord, TraceRecorder};

fn rec(id: impl Into<String>) -> TraceRecord {
    TraceRecord {
        trace_id: id.into(),
        method: "GET".into(),
        path: "/pacientes".into(),
        status_code: 200,
        duration_ms: 3.25,
        timestamp: Utc::now(),
    }
}

fn ids(v: &[TraceRecord]) -> Vec<String> {
    v.iter().map(|t| t.trace_id.clone()).collect()
}

#[test]
fn capacity_three_keeps_last_three() {
    let r = TraceRecorder::new(3);
    for id in ["A", "B", "C", "D"] {
        r.record(rec(id));
    }
    assert_eq!(ids(&r.recent(10)), vec!["B", "C", "D"]);
}

#[test]
fn oldest_is_evicted_first() {
    const CAP: usize = 20;
    let r = TraceRecorder::new(CAP);
    for i in 1..=CAP + 1 {
        r.record(rec(i.to_string()));
    }

    let got = ids(&r.recent(CAP));
    let want: Vec<String> = (2..=CAP + 1).map(|i| i.to_string()).collect();
    assert_eq!(got, want);
    assert!(!got.contains(&"1".to_string()));
}

#[test]
fn never_exceeds_capacity() {
    let r = TraceRecorder::new(5);
    for i in 0..100 {
        r.record(rec(i.to_string()));
        assert!(r.len() <= 5);
    }
    assert_eq!(ids(&r.recent(5)), vec!["95", "96", "97", "98", "99"]);
}

#[test]
fn recent_does_not_mutate() {
    let r = TraceRecorder::new(4);
    r.record(rec("x"));
    r.record(rec("y"));
    let first = r.recent(4);
    let second = r.recent(4);
    assert_eq!(first, second);
    assert_eq!(r.len(), 2);

    r.clear();
    assert!(r.is_empty());
}

#[test]
fn concurrent_writers_and_readers_keep_fifo() {
    const CAP: usize = 64;
    const THREADS: usize = 8;
    const PER_THREAD: usize = 1_000;

    let r = Arc::new(TraceRecorder::new(CAP));

    let writers: Vec<_> = (0..THREADS)
        .map(|t| {
            let r = Arc::clone(&r);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    r.record(rec(format!("{t}:{i}")));
                }
            })
        })
        .collect();

    let reader = {
        let r = Arc::clone(&r);
        thread::spawn(move || {
            for _ in 0..2_000 {
                let window = r.recent(CAP);
                assert!(window.len() <= CAP);

                // per producer, ids must appear in increasing order
                let mut last = vec![None::<usize>; THREADS];
                for t in &window {
                    let (p, i) = t.trace_id.split_once(':').unwrap();
                    let (p, i): (usize, usize) = (p.parse().unwrap(), i.parse().unwrap());
                    if let Some(prev) = last[p] {
                        assert!(i > prev, "out of order within producer {p}");
                    }
                    last[p] = Some(i);
                }
            }
        })
    };

    for w in writers {
        w.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(r.len(), CAP);
}
