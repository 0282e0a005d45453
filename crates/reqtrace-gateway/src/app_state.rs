//! Shared application state for the reqtrace gateway.
//!
//! Owns the configuration, the process-wide `Telemetry` context and the event
//! log writer. All are built once at startup; handlers and the middleware get
//! cheap clones.

use std::sync::Arc;
use std::time::Duration;

use reqtrace_core::error::Result;
use reqtrace_core::Telemetry;

use crate::config::GatewayConfig;
use crate::obs::logger::{JsonLineSink, QueuedSink};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    telemetry: Telemetry,
}

struct AppStateInner {
    cfg: GatewayConfig,
    log_writer: Option<Arc<QueuedSink>>,
}

impl AppState {
    /// Build application state, opening the event log named in `cfg.log`.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: GatewayConfig) -> Result<Self> {
        let file = JsonLineSink::open(&cfg.log.path, cfg.log.console)?;
        let sink = Arc::new(QueuedSink::spawn(file, cfg.log.queue)?);

        let telemetry = Telemetry::builder(cfg.telemetry.clone())
            .sink(sink.clone())
            .build()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                log_writer: Some(sink),
            }),
            telemetry,
        })
    }

    /// Use a prebuilt telemetry context (custom sink / id strategy).
    pub fn with_telemetry(cfg: GatewayConfig, telemetry: Telemetry) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                log_writer: None,
            }),
            telemetry,
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.cfg().gateway.request_timeout_ms)
    }

    /// Flush and stop the event log writer. Blocks until every accepted line
    /// is on disk; events logged afterwards count as sink failures.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner.log_writer {
            Some(w) => w.close(),
            None => Ok(()),
        }
    }
}
