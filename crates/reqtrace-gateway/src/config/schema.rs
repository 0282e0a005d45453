use std::net::SocketAddr;

use serde::Deserialize;
use reqtrace_core::error::{Result, TelemetryError};
use reqtrace_core::TelemetryConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub log: LogSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            telemetry: TelemetryConfig::default(),
            log: LogSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TelemetryError::UnsupportedVersion);
        }

        self.gateway.validate()?;
        self.telemetry.validate()?;
        self.log.validate()?;

        Ok(())
    }

    /// Replace the port of `gateway.listen` (the `PORT` environment variable).
    /// A blank value leaves the configured port alone.
    pub fn apply_port_override(&mut self, port: &str) -> Result<()> {
        let port = port.trim();
        if port.is_empty() {
            return Ok(());
        }
        let port: u16 = port
            .parse()
            .map_err(|e| TelemetryError::InvalidConfig(format!("PORT must be a port number: {e}")))?;
        let mut addr = self.gateway.listen_addr()?;
        addr.set_port(port);
        self.gateway.listen = addr.to_string();
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Requests still running after this long are answered with 504.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(100..=600_000).contains(&self.request_timeout_ms) {
            return Err(TelemetryError::InvalidConfig(
                "gateway.request_timeout_ms must be between 100 and 600000".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            TelemetryError::InvalidConfig(format!("gateway.listen must be a valid SocketAddr: {e}"))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:3000".into()
}
fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Durable JSON-lines event log.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Echo every line to stdout as well.
    #[serde(default = "default_console")]
    pub console: bool,

    /// Bounded queue between request paths and the writer thread.
    #[serde(default = "default_queue")]
    pub queue: usize,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            console: default_console(),
            queue: default_queue(),
        }
    }
}

impl LogSection {
    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(TelemetryError::InvalidConfig("log.path must not be empty".into()));
        }
        if !(1..=65_536).contains(&self.queue) {
            return Err(TelemetryError::InvalidConfig(
                "log.queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }
}

fn default_log_path() -> String {
    "./logs.txt".into()
}
fn default_console() -> bool {
    true
}
fn default_queue() -> usize {
    1024
}
