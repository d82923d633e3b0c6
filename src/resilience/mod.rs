//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Listener-level accept error:
//!     → backoff.rs (exponential delay with jitter)
//!     → retry accept, or give up after too many consecutive failures
//! ```

pub mod backoff;

pub use backoff::Backoff;
