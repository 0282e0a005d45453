//! Telemetry tuning knobs, embedded in the gateway YAML under `telemetry:`.

use serde::Deserialize;

use crate::error::{Result, TelemetryError};

/// Upper bound on retained traces; keeps a typo from pinning gigabytes.
pub const MAX_TRACE_CAPACITY: usize = 100_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Ring buffer capacity for recent traces.
    #[serde(default = "default_trace_capacity")]
    pub trace_capacity: usize,

    /// How many traces the `/traces` view returns.
    #[serde(default = "default_trace_window")]
    pub trace_window: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            trace_capacity: default_trace_capacity(),
            trace_window: default_trace_window(),
        }
    }
}

impl TelemetryConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TRACE_CAPACITY).contains(&self.trace_capacity) {
            return Err(TelemetryError::InvalidConfig(format!(
                "telemetry.trace_capacity must be between 1 and {MAX_TRACE_CAPACITY}"
            )));
        }
        if self.trace_window == 0 || self.trace_window > self.trace_capacity {
            return Err(TelemetryError::InvalidConfig(
                "telemetry.trace_window must be between 1 and trace_capacity".into(),
            ));
        }
        Ok(())
    }
}

fn default_trace_capacity() -> usize {
    200
}
fn default_trace_window() -> usize {
    200
}
