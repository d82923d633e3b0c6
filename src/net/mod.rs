//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, error classification)
//!     → connection.rs (lifecycle tracking, close notification)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     Active → Closing (finish in-flight exchange) → Closed
//! ```
//!
//! # Design Decisions
//! - Each connection tracked so a graceful close can wait for the last one
//! - Per-connection accept errors never stop the listener

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{Listener, ListenerError};
