//! Text exposition of a [`MetricsSnapshot`].
//!
//! Output is Prometheus-compatible: a `# TYPE` line followed by one sample
//! per line, in a fixed order. Floats are written with Rust's shortest
//! round-trip formatting so a scraper parsing a value gets back the exact
//! `f64` that was rendered; non-finite values use the `+Inf`/`-Inf`/`NaN`
//! spellings.

use std::fmt::{self, Write};

use crate::metrics::{MetricsSnapshot, LATENCY_BUCKETS_MS};

pub const REQUESTS_TOTAL: &str = "reqtrace_requests_total";
pub const ERRORS_TOTAL: &str = "reqtrace_errors_total";
pub const DURATION_SUM_MS: &str = "reqtrace_request_duration_ms_sum";
pub const DURATION_AVG_MS: &str = "reqtrace_request_duration_ms_avg";
pub const LATENCY_MS: &str = "reqtrace_request_latency_ms";
pub const SINK_FAILURES_TOTAL: &str = "reqtrace_sink_failures_total";
pub const ROUTE_REQUESTS_TOTAL: &str = "reqtrace_route_requests_total";

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Float sample value in exposition syntax.
struct Sample(f64);

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v.is_nan() {
            f.write_str("NaN")
        } else if v.is_infinite() {
            f.write_str(if v > 0.0 { "+Inf" } else { "-Inf" })
        } else {
            write!(f, "{v}")
        }
    }
}

/// The four headline series: total, errors, duration sum, average.
pub fn render(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();
    render_headline(snapshot, &mut out);
    out
}

/// Headline series plus latency histogram, sink failures, per-route counters
/// and caller-supplied gauges (rendered last, in the given order).
pub fn render_with(snapshot: &MetricsSnapshot, extra: &[(&str, u64)]) -> String {
    let mut out = String::new();
    render_headline(snapshot, &mut out);
    render_histogram(snapshot, &mut out);

    let _ = writeln!(out, "# TYPE {SINK_FAILURES_TOTAL} counter");
    let _ = writeln!(out, "{SINK_FAILURES_TOTAL} {}", snapshot.sink_failures);

    let _ = writeln!(out, "# TYPE {ROUTE_REQUESTS_TOTAL} counter");
    for r in &snapshot.routes {
        let _ = writeln!(
            out,
            "{ROUTE_REQUESTS_TOTAL}{{method=\"{}\",path=\"{}\",status=\"{}\"}} {}",
            escape_label(&r.method),
            escape_label(&r.path),
            r.status,
            r.count
        );
    }

    for (k, v) in extra {
        let _ = writeln!(out, "# TYPE {k} gauge\n{k} {v}");
    }
    out
}

fn render_headline(s: &MetricsSnapshot, out: &mut String) {
    let _ = writeln!(out, "# TYPE {REQUESTS_TOTAL} counter");
    let _ = writeln!(out, "{REQUESTS_TOTAL} {}", s.total_requests);
    let _ = writeln!(out, "# TYPE {ERRORS_TOTAL} counter");
    let _ = writeln!(out, "{ERRORS_TOTAL} {}", s.errors);
    let _ = writeln!(out, "# TYPE {DURATION_SUM_MS} counter");
    let _ = writeln!(out, "{DURATION_SUM_MS} {}", Sample(s.duration_sum_ms));
    let _ = writeln!(out, "# TYPE {DURATION_AVG_MS} gauge");
    let _ = writeln!(out, "{DURATION_AVG_MS} {}", Sample(s.avg_duration_ms));
}

fn render_histogram(s: &MetricsSnapshot, out: &mut String) {
    let _ = writeln!(out, "# TYPE {LATENCY_MS} histogram");
    for (le, count) in LATENCY_BUCKETS_MS.iter().zip(&s.latency_buckets) {
        let _ = writeln!(out, "{LATENCY_MS}_bucket{{le=\"{le}\"}} {count}");
    }
    let _ = writeln!(out, "{LATENCY_MS}_bucket{{le=\"+Inf\"}} {}", s.total_requests);
    let _ = writeln!(out, "{LATENCY_MS}_sum {}", Sample(s.duration_sum_ms));
    let _ = writeln!(out, "{LATENCY_MS}_count {}", s.total_requests);
}
