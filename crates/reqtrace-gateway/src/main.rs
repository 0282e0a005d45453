//! reqtrace gateway binary.
//!
//! - Config: `REQTRACE_CONFIG` (default `reqtrace.yaml`, built-in defaults if absent)
//! - `PORT` overrides the listen port (ignored when empty)
//! - Routes: `/`, `/healthz`, `/metrics`, `/traces`

use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reqtrace_core::error::{Result, TelemetryError};
use reqtrace_core::sink::Fields;
use reqtrace_gateway::{app_state::AppState, config, router};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.code(), "reqtrace-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::var("REQTRACE_CONFIG").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.into());
    let mut cfg = config::load_or_default(&path)?;
    if let Ok(port) = std::env::var("PORT") {
        cfg.apply_port_override(&port)?;
    }
    let listen = cfg.gateway.listen_addr()?;

    let state = AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(%listen, "reqtrace-gateway starting");

    let mut fields = Fields::new();
    fields.insert("port".into(), Value::from(listen.port()));
    state.telemetry().log_event("server listening", &fields);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let log_writer = state.clone();
    tokio::task::spawn_blocking(move || log_writer.shutdown())
        .await
        .map_err(|e| TelemetryError::Internal(format!("log shutdown task failed: {e}")))??;

    tracing::info!(path = %state.cfg().log.path, "reqtrace-gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
