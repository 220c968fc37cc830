//! Daemon configuration (`config.yml`).
//!
//! Every field has a default; a missing or unreadable file yields the
//! defaults, and a commented default file is written on first start so
//! operators have something to edit.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_yaml::Value;
use tracing::debug;

const DEFAULT_RENEW_INTERVAL_MS: u64 = 5_000;
const DEFAULT_HTTP_API_ENABLED: bool = true;
const DEFAULT_HTTP_API_PORT: u16 = 8085;
const DEFAULT_BASE_PORT: u16 = 25565;

/// Application-level daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Interval between renewal ticks, in milliseconds. Non-positive
    /// values fall back to the default.
    pub renew_interval_ms: u64,
    pub http_api_enabled: bool,
    pub http_api_port: u16,
    /// First candidate port for instance allocation.
    pub base_port: u16,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            renew_interval_ms: DEFAULT_RENEW_INTERVAL_MS,
            http_api_enabled: DEFAULT_HTTP_API_ENABLED,
            http_api_port: DEFAULT_HTTP_API_PORT,
            base_port: DEFAULT_BASE_PORT,
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a YAML file, falling back to defaults for
    /// anything missing or unparsable. Never fails.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            debug!(?path, "no config file, using defaults");
            return Self::default();
        };
        let Ok(value) = serde_yaml::from_str::<Value>(&content) else {
            debug!(?path, "unparsable config file, using defaults");
            return Self::default();
        };

        let renew_interval_ms = read_u64(&value, "renewIntervalMs", DEFAULT_RENEW_INTERVAL_MS);
        Self {
            renew_interval_ms: if renew_interval_ms == 0 {
                DEFAULT_RENEW_INTERVAL_MS
            } else {
                renew_interval_ms
            },
            http_api_enabled: read_bool(&value, "httpApiEnabled", DEFAULT_HTTP_API_ENABLED),
            http_api_port: read_u16(&value, "httpApiPort", DEFAULT_HTTP_API_PORT),
            base_port: read_u16(&value, "basePort", DEFAULT_BASE_PORT),
        }
    }

    /// Write a commented default config file unless one already exists.
    pub fn write_default_if_missing(path: &Path) -> std::io::Result<()> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = format!(
            "# fleetgrid daemon configuration\n\
             renewIntervalMs: {DEFAULT_RENEW_INTERVAL_MS}\n\
             httpApiEnabled: {DEFAULT_HTTP_API_ENABLED}\n\
             httpApiPort: {DEFAULT_HTTP_API_PORT}\n\
             basePort: {DEFAULT_BASE_PORT}\n"
        );
        fs::write(path, content)
    }

    pub fn renew_interval(&self) -> Duration {
        Duration::from_millis(self.renew_interval_ms)
    }
}

fn read_u64(value: &Value, key: &str, fallback: u64) -> u64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(fallback),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(fallback),
        _ => fallback,
    }
}

fn read_u16(value: &Value, key: &str, fallback: u16) -> u16 {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .unwrap_or(fallback),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(fallback),
        _ => fallback,
    }
}

fn read_bool(value: &Value, key: &str, fallback: bool) -> bool {
    match value.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(fallback),
        _ => fallback,
    }
}
