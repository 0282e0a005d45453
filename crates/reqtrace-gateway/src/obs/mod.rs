//! Request observation: the instrumentation middleware and the durable
//! event log it reports to.

pub mod logger;
pub mod middleware;

pub use middleware::{TraceContext, TRACE_ID_HEADER};
