//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper connection, header limits, graceful close)
//!     → request.rs (assign X-Call-Id)
//!     → observability::tracing (Invoke span)
//!     → server.rs invoke (read body within read_timeout)
//!     → handler.rs (function contract)
//!     → response written within write_timeout
//! ```

pub mod handler;
pub mod request;
pub mod server;

pub use handler::{FunctionRequest, FunctionResponse, Handler, HandlerError};
pub use request::{call_id_layer, MakeCallId, X_CALL_ID};
pub use server::{HttpServer, ServeError, MAX_HEADER_BYTES};
