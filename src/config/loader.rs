//! Configuration loading from environment-style key/value pairs.

use std::collections::HashMap;

use crate::config::schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, RuntimeConfig, SignalConfig,
};
use crate::config::timeouts::{
    TimeoutPolicy, DEFAULT_TIMEOUT, HEALTHCHECK_INTERVAL_KEY, READ_TIMEOUT_KEY,
    SHUTDOWN_GRACE_KEY, WRITE_TIMEOUT_KEY,
};

pub const HOST_KEY: &str = "host";
pub const PORT_KEY: &str = "port";
pub const HANDLE_SIGINT_KEY: &str = "handle_sigint";
pub const LOG_FORMAT_KEY: &str = "log_format";
pub const METRICS_ADDRESS_KEY: &str = "metrics_address";

/// Every key the runtime reads.
pub const KEYS: [&str; 9] = [
    READ_TIMEOUT_KEY,
    WRITE_TIMEOUT_KEY,
    HEALTHCHECK_INTERVAL_KEY,
    SHUTDOWN_GRACE_KEY,
    HOST_KEY,
    PORT_KEY,
    HANDLE_SIGINT_KEY,
    LOG_FORMAT_KEY,
    METRICS_ADDRESS_KEY,
];

/// Build a [`RuntimeConfig`] from key/value pairs.
///
/// Never fails: every unparsable value is replaced by its default.
pub fn load_from_vars(vars: &HashMap<String, String>) -> RuntimeConfig {
    let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

    let defaults = ListenerConfig::default();
    let listener = ListenerConfig {
        host: get(HOST_KEY).map(str::to_string).unwrap_or(defaults.host),
        port: get(PORT_KEY)
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port),
    };

    let signals = SignalConfig {
        handle_interrupt: get(HANDLE_SIGINT_KEY).is_some_and(parse_flag),
    };

    let observability = ObservabilityConfig {
        log_format: match get(LOG_FORMAT_KEY) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        },
        metrics_address: get(METRICS_ADDRESS_KEY).and_then(|v| v.parse().ok()),
    };

    RuntimeConfig {
        listener,
        timeouts: TimeoutPolicy::resolve(vars, DEFAULT_TIMEOUT),
        signals,
        observability,
    }
}

/// Build a [`RuntimeConfig`] from the process environment.
///
/// Only [`KEYS`] are read; a key whose value is not valid Unicode counts as
/// unset.
pub fn load_from_env() -> RuntimeConfig {
    let vars: HashMap<String, String> = KEYS
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
        .collect();
    load_from_vars(&vars)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
