//! Top-level facade crate for reqtrace.
//!
//! Re-exports the telemetry core and the gateway library so users can depend on a single crate.

pub mod core {
    pub use reqtrace_core::*;
}

pub mod gateway {
    pub use reqtrace_gateway::*;
}
