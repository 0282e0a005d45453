//! reqtrace core: transport-agnostic request telemetry.
//!
//! This crate owns the shared telemetry state (aggregate counters and the
//! recent-trace ring buffer), the per-request instrumentation protocol, and the
//! text exposition renderer. It carries no HTTP or runtime dependencies so the
//! same context can sit behind any host that can signal request start/finish.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Telemetry is best-effort and must never take the hosting process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;
pub mod exporter;
pub mod id;
pub mod instrument;
pub mod metrics;
pub mod sink;
pub mod trace;

/// Shared result type.
pub use error::{Result, TelemetryError};

pub use config::TelemetryConfig;
pub use id::{SequentialGenerator, TraceIdGenerator, UuidGenerator};
pub use instrument::{Outcome, RequestSpan, Telemetry, TelemetryBuilder};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use sink::{EventSink, Fields, NoopSink};
pub use trace::{TraceRecord, TraceRecorder};
