//! reqtrace gateway library entry.
//!
//! Hosts the telemetry core behind axum: config loading, shared state, the
//! request instrumentation middleware, the JSON-lines event log, and the ops
//! routes that expose metrics and recent traces. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
