//! Trace identifier strategies.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Produces one identifier per request. Must be cheap and thread-safe.
pub trait TraceIdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random 128-bit v4 UUID, hyphenated. The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl TraceIdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// `prefix-1`, `prefix-2`, ... Deterministic ids for tests and local debugging.
#[derive(Debug)]
pub struct SequentialGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl TraceIdGenerator for SequentialGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}
