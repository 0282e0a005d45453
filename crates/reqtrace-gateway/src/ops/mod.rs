//! Operational HTTP endpoints.
//!
//! - `/`        : service banner
//! - `/healthz` : liveness
//! - `/metrics` : text exposition of the aggregate counters
//! - `/traces`  : JSON array of the most recent traces

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::Value;

use reqtrace_core::exporter;
use reqtrace_core::sink::Fields;

use crate::app_state::AppState;
use crate::obs::TraceContext;

pub async fn root(State(state): State<AppState>, Extension(ctx): Extension<TraceContext>) -> impl IntoResponse {
    let mut fields = Fields::new();
    fields.insert("traceId".into(), Value::from(ctx.trace_id));
    state.telemetry().log_event("banner served", &fields);

    (StatusCode::OK, "reqtrace gateway online")
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let telemetry = state.telemetry();
    let extra = [
        ("reqtrace_traces_buffered", telemetry.traces().len() as u64),
        ("reqtrace_traces_capacity", telemetry.traces().capacity() as u64),
        ("reqtrace_traces_window", telemetry.config().trace_window as u64),
    ];
    let body = exporter::render_with(&telemetry.snapshot(), &extra);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

pub async fn traces(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.telemetry().recent_traces())
}
