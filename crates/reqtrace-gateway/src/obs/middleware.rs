//! Axum middleware that brackets every request with a telemetry span.
//!
//! The span is started before the handler runs and finished exactly once with
//! whatever the handler produced: its status, a fault if it panicked, or a
//! timeout if it outlived `gateway.request_timeout_ms`. A request future that
//! is dropped mid-flight (client gone) is completed by the span itself.

use std::panic::AssertUnwindSafe;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::FutureExt;

use reqtrace_core::Outcome;

use crate::app_state::AppState;

/// Response header carrying the request's trace id.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Request extension handlers can use to tag their own log events.
#[derive(Debug, Clone)]
pub struct TraceContext {
    pub trace_id: String,
}

pub async fn track_requests(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let mut span = state
        .telemetry()
        .start(req.method().as_str(), req.uri().path());
    if let Some(route) = req.extensions().get::<MatchedPath>() {
        span = span.with_route(route.as_str());
    }

    let trace_id = span.trace_id().to_owned();
    req.extensions_mut().insert(TraceContext {
        trace_id: trace_id.clone(),
    });

    let run = AssertUnwindSafe(next.run(req)).catch_unwind();
    let (mut response, outcome) = match tokio::time::timeout(state.request_timeout(), run).await {
        Ok(Ok(resp)) => {
            let status = resp.status().as_u16();
            (resp, Outcome::Status(status))
        }
        Ok(Err(_panic)) => {
            tracing::error!(%trace_id, "handler panicked");
            (StatusCode::INTERNAL_SERVER_ERROR.into_response(), Outcome::Fault)
        }
        Err(_elapsed) => {
            let elapsed_ms = span.elapsed().as_millis() as u64;
            tracing::warn!(%trace_id, elapsed_ms, "request timed out");
            (StatusCode::GATEWAY_TIMEOUT.into_response(), Outcome::TimedOut)
        }
    };

    let _ = span.finish(outcome);

    if let Ok(v) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, v);
    }
    response
}
