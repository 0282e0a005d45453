//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use reqtrace_core::error::{Result, TelemetryError};

pub use schema::{GatewayConfig, GatewaySection, LogSection};

/// Used when `REQTRACE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "reqtrace.yaml";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TelemetryError::InvalidConfig(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| TelemetryError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load `path` if it exists, otherwise fall back to built-in defaults.
pub fn load_or_default(path: &str) -> Result<GatewayConfig> {
    if Path::new(path).exists() {
        load_from_file(path)
    } else {
        tracing::info!(path, "config file not found, using defaults");
        Ok(GatewayConfig::default())
    }
}
