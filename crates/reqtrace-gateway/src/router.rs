//! Axum router wiring.
//!
//! Every route, the ops endpoints included, runs behind the request
//! instrumentation layer.

use axum::{middleware, routing::get, Router};

use crate::{app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    instrumented(ops_routes(), state)
}

pub fn ops_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(ops::root))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .route("/traces", get(ops::traces))
        .fallback(ops::not_found)
}

/// Wrap application routes in the telemetry middleware and bind the state.
pub fn instrumented(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(middleware::from_fn_with_state(
            state.clone(),
            obs::middleware::track_requests,
        ))
        .with_state(state)
}
