//! Configuration schema definitions.
//!
//! All types derive `Serialize` so the resolved configuration can be logged
//! once at startup.

use serde::Serialize;
use std::net::SocketAddr;

use crate::config::timeouts::TimeoutPolicy;

/// Root configuration for the function runtime.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RuntimeConfig {
    /// Listener configuration (bind host and port).
    pub listener: ListenerConfig,

    /// Read/write/drain durations.
    pub timeouts: TimeoutPolicy,

    /// Which termination signals start the shutdown sequence.
    pub signals: SignalConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerConfig {
    /// Bind host (e.g., "0.0.0.0").
    pub host: String,

    /// Bind port. Zero asks the OS for an ephemeral port.
    pub port: u16,
}

impl ListenerConfig {
    pub const DEFAULT_PORT: u16 = 8082;

    /// The `host:port` string handed to the socket layer.
    pub fn bind_address(&self) -> String {
        match self.host.parse::<std::net::IpAddr>() {
            Ok(ip) => SocketAddr::new(ip, self.port).to_string(),
            Err(_) => format!("{}:{}", self.host, self.port),
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: Self::DEFAULT_PORT,
        }
    }
}

/// Signal subscription settings.
#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct SignalConfig {
    /// Also treat SIGINT (Ctrl+C) as a termination signal.
    /// SIGTERM is always handled.
    pub handle_interrupt: bool,
}

/// Output format for the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, one line per event.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Observability settings.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,

    /// Prometheus scrape address; metrics export is off when unset.
    pub metrics_address: Option<SocketAddr>,
}
