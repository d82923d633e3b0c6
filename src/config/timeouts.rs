//! Timeout policy resolution.
//!
//! # Responsibilities
//! - Turn raw `read_timeout` / `write_timeout` / `healthcheck_interval`
//!   strings into concrete durations
//! - Apply fallbacks silently; a bad value never stops the process
//!
//! # Resolution order (per field)
//! ```text
//! ""                      → default
//! non-negative integer    → that many seconds
//! duration literal        → parsed duration
//! anything else           → default
//! ```
//!
//! A bare integer is always seconds, never nanoseconds. Literals use the
//! `humantime` grammar (`300ms`, `1h30m`, `250us`). Resolved values are
//! capped at [`MAX_TIMEOUT`] so deadlines never overflow `Instant`.

use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;


/// Default for `read_timeout` and `write_timeout`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ceiling on any resolved duration (one year).
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub const READ_TIMEOUT_KEY: &str = "read_timeout";
pub const WRITE_TIMEOUT_KEY: &str = "write_timeout";
pub const HEALTHCHECK_INTERVAL_KEY: &str = "healthcheck_interval";
pub const SHUTDOWN_GRACE_KEY: &str = "shutdown_grace";

/// Resolved durations governing request handling and shutdown.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutPolicy {
    /// Bound on reading request headers and body. Zero disables it.
    #[serde(serialize_with = "serialize_duration")]
    pub read_timeout: Duration,

    /// Bound on producing the response, and on the graceful close.
    /// Zero disables the per-request bound.
    #[serde(serialize_with = "serialize_duration")]
    pub write_timeout: Duration,

    /// Drain window between the termination signal and closing the socket.
    #[serde(serialize_with = "serialize_duration")]
    pub healthcheck_interval: Duration,

    /// Window granted after the close is issued before the process exits.
    /// Defaults to `healthcheck_interval`.
    #[serde(serialize_with = "serialize_duration")]
    pub shutdown_grace: Duration,
}

impl TimeoutPolicy {
    /// Resolve all fields from environment-style key/value pairs.
    ///
    /// `read_timeout` and `write_timeout` fall back to `default`;
    /// `healthcheck_interval` falls back to the resolved `write_timeout`;
    /// `shutdown_grace` falls back to the resolved `healthcheck_interval`.
    pub fn resolve(vars: &HashMap<String, String>, default: Duration) -> Self {
        let raw = |key: &str| vars.get(key).map(String::as_str).unwrap_or("");

        let read_timeout = parse_int_or_duration(raw(READ_TIMEOUT_KEY), default);
        let write_timeout = parse_int_or_duration(raw(WRITE_TIMEOUT_KEY), default);
        let healthcheck_interval =
            parse_int_or_duration(raw(HEALTHCHECK_INTERVAL_KEY), write_timeout);
        let shutdown_grace = parse_int_or_duration(raw(SHUTDOWN_GRACE_KEY), healthcheck_interval);

        Self {
            read_timeout,
            write_timeout,
            healthcheck_interval,
            shutdown_grace,
        }
    }

    /// Per-request read bound, `None` when disabled. Capped at [`MAX_TIMEOUT`].
    pub fn read_limit(&self) -> Option<Duration> {
        non_zero(self.read_timeout.min(MAX_TIMEOUT))
    }

    /// Per-request write bound, `None` when disabled. Capped at [`MAX_TIMEOUT`].
    pub fn write_limit(&self) -> Option<Duration> {
        non_zero(self.write_timeout.min(MAX_TIMEOUT))
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            healthcheck_interval: DEFAULT_TIMEOUT,
            shutdown_grace: DEFAULT_TIMEOUT,
        }
    }
}

/// Resolve one raw value: integer seconds first, then a duration literal,
/// then `fallback`. The result never exceeds [`MAX_TIMEOUT`].
pub fn parse_int_or_duration(raw: &str, fallback: Duration) -> Duration {
    let resolved = if raw.is_empty() {
        fallback
    } else if let Ok(secs) = raw.parse::<i64>() {
        match u64::try_from(secs) {
            Ok(secs) => Duration::from_secs(secs),
            Err(_) => fallback,
        }
    } else {
        humantime::parse_duration(raw).unwrap_or(fallback)
    };

    resolved.min(MAX_TIMEOUT)
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("{duration:?}"))
}
