//! Per-request instrumentation.
//!
//! `Telemetry` is the process-wide context: it owns the aggregator and the
//! trace ring buffer and is cloned (cheaply, `Arc` inside) into every request
//! path. A request is bracketed by [`Telemetry::start`], which hands back a
//! [`RequestSpan`] completion token, and [`RequestSpan::finish`], which
//! consumes it. Completion is therefore exactly-once by construction; a span
//! dropped without `finish` (the host cancelled the request future) completes
//! itself as [`Outcome::Cancelled`] so no started request is left dangling.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::id::{TraceIdGenerator, UuidGenerator};
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::sink::{EventSink, Fields, NoopSink};
use crate::trace::{TraceRecord, TraceRecorder};

/// Status used when the client went away before a response was produced.
pub const STATUS_CLIENT_CLOSED: u16 = 499;

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response with this status was produced.
    Status(u16),
    /// The handler faulted (panicked) before producing a response.
    Fault,
    /// The request future was dropped before completion.
    Cancelled,
    /// The host gave up waiting for the handler.
    TimedOut,
}

impl Outcome {
    pub fn status(self) -> u16 {
        match self {
            Outcome::Status(s) => s,
            Outcome::Fault => 500,
            Outcome::Cancelled => STATUS_CLIENT_CLOSED,
            Outcome::TimedOut => 504,
        }
    }

    /// Server-side failures only; 4xx and client cancellation are not errors.
    pub fn is_error(self) -> bool {
        match self {
            Outcome::Status(s) => s >= 500,
            Outcome::Fault | Outcome::TimedOut => true,
            Outcome::Cancelled => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Status(_) => "completed",
            Outcome::Fault => "fault",
            Outcome::Cancelled => "cancelled",
            Outcome::TimedOut => "timeout",
        }
    }
}

struct TelemetryInner {
    cfg: TelemetryConfig,
    metrics: MetricsAggregator,
    traces: TraceRecorder,
    ids: Arc<dyn TraceIdGenerator>,
    sink: Arc<dyn EventSink>,
}

/// Shared telemetry context.
#[derive(Clone)]
pub struct Telemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telemetry")
            .field("cfg", &self.inner.cfg)
            .field("traces", &self.inner.traces.len())
            .finish_non_exhaustive()
    }
}

pub struct TelemetryBuilder {
    cfg: TelemetryConfig,
    ids: Arc<dyn TraceIdGenerator>,
    sink: Arc<dyn EventSink>,
}

impl TelemetryBuilder {
    pub fn id_generator(mut self, ids: Arc<dyn TraceIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Fails with `InvalidConfig` when the trace settings are out of range.
    pub fn build(self) -> Result<Telemetry> {
        self.cfg.validate()?;
        let traces = TraceRecorder::new(self.cfg.trace_capacity);
        Ok(Telemetry {
            inner: Arc::new(TelemetryInner {
                cfg: self.cfg,
                metrics: MetricsAggregator::new(),
                traces,
                ids: self.ids,
                sink: self.sink,
            }),
        })
    }
}

impl Telemetry {
    /// Context with UUID trace ids and no event sink.
    pub fn new(cfg: TelemetryConfig) -> Result<Self> {
        Self::builder(cfg).build()
    }

    pub fn builder(cfg: TelemetryConfig) -> TelemetryBuilder {
        TelemetryBuilder {
            cfg,
            ids: Arc::new(UuidGenerator),
            sink: Arc::new(NoopSink),
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.inner.metrics
    }

    pub fn traces(&self) -> &TraceRecorder {
        &self.inner.traces
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// The configured `/traces` window.
    pub fn recent_traces(&self) -> Vec<TraceRecord> {
        self.inner.traces.recent(self.inner.cfg.trace_window)
    }

    /// Begin instrumenting one request.
    pub fn start(&self, method: impl Into<String>, path: impl Into<String>) -> RequestSpan {
        RequestSpan {
            telemetry: self.clone(),
            trace_id: self.inner.ids.next_id(),
            method: method.into(),
            path: path.into(),
            route: None,
            started: Instant::now(),
            done: false,
        }
    }

    /// Forward an application event to the sink. Failures are counted and
    /// logged, never returned.
    pub fn log_event(&self, message: &str, fields: &Fields) {
        if let Err(e) = self.inner.sink.log(message, fields) {
            self.inner.metrics.record_sink_failure();
            tracing::warn!(error = %e, code = e.code(), "event sink failed");
        }
    }
}

/// Completion token for one in-flight request.
#[must_use = "a span records its request when finished or dropped"]
pub struct RequestSpan {
    telemetry: Telemetry,
    trace_id: String,
    method: String,
    path: String,
    route: Option<String>,
    started: Instant,
    done: bool,
}

impl fmt::Debug for RequestSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpan")
            .field("trace_id", &self.trace_id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}

impl RequestSpan {
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Route pattern used for per-route counters (e.g. `/items/:id`).
    /// Defaults to the raw path.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Record the request and hand back the stored trace.
    pub fn finish(mut self, outcome: Outcome) -> TraceRecord {
        self.complete(outcome)
    }

    fn complete(&mut self, outcome: Outcome) -> TraceRecord {
        self.done = true;

        let duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let status = outcome.status();
        let is_error = outcome.is_error();
        let inner = &self.telemetry.inner;

        inner.metrics.record_request(duration_ms, is_error);
        inner.metrics.record_route(
            &self.method,
            self.route.as_deref().unwrap_or(self.path.as_str()),
            status,
        );

        let record = TraceRecord {
            trace_id: self.trace_id.clone(),
            method: self.method.clone(),
            path: self.path.clone(),
            status_code: status,
            duration_ms,
            timestamp: Utc::now(),
        };
        inner.traces.record(record.clone());

        tracing::debug!(
            trace_id = %record.trace_id,
            method = %record.method,
            path = %record.path,
            status,
            duration_ms,
            outcome = outcome.as_str(),
            "request completed"
        );

        let mut fields = Fields::new();
        fields.insert("traceId".into(), Value::from(record.trace_id.as_str()));
        fields.insert("method".into(), Value::from(record.method.as_str()));
        fields.insert("path".into(), Value::from(record.path.as_str()));
        fields.insert("statusCode".into(), Value::from(status));
        fields.insert("duration_ms".into(), Value::from(duration_ms));
        fields.insert("outcome".into(), Value::from(outcome.as_str()));
        self.telemetry.log_event("request completed", &fields);

        record
    }
}

impl Drop for RequestSpan {
    fn drop(&mut self) {
        if !self.done {
            let _ = self.complete(Outcome::Cancelled);
        }
    }
}
