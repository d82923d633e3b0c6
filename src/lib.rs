//! Serverless function runtime.
//!
//! Starts an HTTP listener, forwards every request to a single function
//! handler, and shuts down gracefully on SIGTERM: stop accepting, drain,
//! close, exit.

pub mod config;
pub mod function;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::schema::RuntimeConfig;
pub use http::{FunctionRequest, FunctionResponse, Handler, HandlerError, HttpServer};
pub use lifecycle::{AcceptingState, Runtime, RuntimeError};
