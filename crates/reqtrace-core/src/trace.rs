//! Recent-trace ring buffer.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MAX_TRACE_CAPACITY;

/// One immutable observation of a completed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    #[serde(rename = "traceId")]
    pub trace_id: String,
    /// HTTP method, or a logical step name for non-HTTP hosts.
    pub method: String,
    pub path: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

/// Fixed-capacity FIFO of the most recent traces.
///
/// Inserting into a full buffer evicts exactly one record, the oldest.
#[derive(Debug)]
pub struct TraceRecorder {
    capacity: usize,
    buf: Mutex<VecDeque<TraceRecord>>,
}

impl TraceRecorder {
    /// `capacity` is clamped to at least 1. Storage is preallocated up to
    /// [`MAX_TRACE_CAPACITY`] and grows on demand past it.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buf: Mutex::new(VecDeque::with_capacity(capacity.min(MAX_TRACE_CAPACITY))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, trace: TraceRecord) {
        let mut buf = self.lock();
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(trace);
    }

    /// Last `min(n, len)` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<TraceRecord> {
        let buf = self.lock();
        let skip = buf.len().saturating_sub(n);
        buf.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TraceRecord>> {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
