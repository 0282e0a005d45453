//! Structured event sink consumed by the instrumentation.
//!
//! The contract mirrors a plain application logger: a message plus a flat map
//! of fields. Whether a sink writes inline or hands off to a background writer
//! is decided by the implementation; the instrumentation only ever sees a
//! `Result` and swallows the error side.

use serde_json::{Map, Value};

use crate::error::Result;

/// Flat field map attached to an event.
pub type Fields = Map<String, Value>;

pub trait EventSink: Send + Sync {
    fn log(&self, message: &str, fields: &Fields) -> Result<()>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log(&self, _message: &str, _fields: &Fields) -> Result<()> {
        Ok(())
    }
}
