//! Shared error type across reqtrace crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Unified error type used by core and gateway.
///
/// Nothing on the request path returns these to a client; they surface at
/// startup (config, sink setup), at shutdown (log writer) or from an
/// `EventSink` whose failure is swallowed by the instrumentation.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("event sink: {0}")]
    Sink(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl TelemetryError {
    /// Stable machine-readable code, used in logs and tests.
    pub fn code(&self) -> &'static str {
        match self {
            TelemetryError::InvalidConfig(_) => "INVALID_CONFIG",
            TelemetryError::UnsupportedVersion => "UNSUPPORTED_VERSION",
            TelemetryError::Sink(_) => "SINK",
            TelemetryError::Io(_) => "IO",
            TelemetryError::Internal(_) => "INTERNAL",
        }
    }
}
