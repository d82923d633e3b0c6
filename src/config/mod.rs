//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (key → value)
//!     → loader.rs (read keys, silent fallbacks)
//!     → timeouts.rs (integer seconds | duration literal | default, capped)
//!     → RuntimeConfig (immutable)
//!     → handed by value to the lifecycle controller
//! ```
//!
//! # Design Decisions
//! - Read once at startup; nothing is reloaded
//! - Malformed values degrade to defaults instead of failing startup
//! - Every field has a default so an empty environment is a valid config

pub mod loader;
pub mod schema;
pub mod timeouts;

pub use schema::{ListenerConfig, LogFormat, ObservabilityConfig, RuntimeConfig, SignalConfig};
pub use timeouts::{TimeoutPolicy, DEFAULT_TIMEOUT, MAX_TIMEOUT};
