//! HTTP server setup and run loop.
//!
//! # Responsibilities
//! - Build the Axum router: one catch-all endpoint in front of the function
//! - Configure HTTP/1.1 and HTTP/2 (header size ceiling, header read timeout)
//! - Run the accept loop until asked to close, or until the listener fails
//! - Close gracefully: stop accepting, let in-flight requests finish
//!
//! # Design Decisions
//! - Hand-driven accept loop rather than `axum::serve`, so the hyper
//!   connection settings are ours to choose
//! - A deliberate close is the only `Ok` exit of the run loop
//! - Per-request failures become HTTP error statuses, never run-loop errors
//!
//! # Read and write bounds
//! `read_timeout` is applied as two separate windows: hyper's header read
//! timeout covers the request line and headers, then the endpoint gets a
//! fresh window to read the body. A request may therefore take up to twice
//! `read_timeout` to arrive in full. `write_timeout` bounds everything from
//! routing to the finished response.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tower::ServiceExt;
use tower_http::timeout::TimeoutLayer;

use crate::config::TimeoutPolicy;
use crate::http::handler::{FunctionRequest, Handler};
use crate::http::request::call_id_layer;
use crate::net::listener::{is_connection_error, Listener};
use crate::net::ConnectionTracker;
use crate::observability::{metrics, tracing::invoke_trace_layer};
use crate::resilience::Backoff;

/// Ceiling on request header size (1 MiB).
pub const MAX_HEADER_BYTES: usize = 1 << 20;

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);
/// Consecutive listener-level accept failures tolerated before giving up.
const MAX_ACCEPT_FAILURES: u32 = 10;

/// Why the run loop ended, other than a deliberate close.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The listening socket kept failing to accept.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The run-loop task panicked or was cancelled.
    #[error("server task aborted: {0}")]
    Aborted(String),

    /// The run loop returned without being asked to close.
    #[error("server stopped unexpectedly")]
    Stopped,
}

/// State injected into the catch-all endpoint.
struct InvokeState<H> {
    handler: Arc<H>,
    read_timeout: Option<Duration>,
}

impl<H> Clone for InvokeState<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            read_timeout: self.read_timeout,
        }
    }
}

/// HTTP server for one function.
pub struct HttpServer {
    router: Router,
    timeouts: TimeoutPolicy,
    connections: ConnectionTracker,
}

impl HttpServer {
    /// Create a new HTTP server dispatching every request to `handler`.
    pub fn new<H: Handler>(handler: H, timeouts: TimeoutPolicy) -> Self {
        let router = Self::build_router(Arc::new(handler), &timeouts);
        Self {
            router,
            timeouts,
            connections: ConnectionTracker::new(),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<H: Handler>(handler: Arc<H>, timeouts: &TimeoutPolicy) -> Router {
        let state = InvokeState {
            handler,
            read_timeout: timeouts.read_limit(),
        };

        let router = Router::new().fallback(invoke::<H>).with_state(state);
        let router = match timeouts.write_limit() {
            Some(limit) => router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                limit,
            )),
            None => router,
        };

        router.layer(invoke_trace_layer()).layer(call_id_layer())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Returns `Ok` once `close` fires (or its sender is dropped) and every
    /// in-flight exchange has finished.
    pub async fn run(
        self,
        listener: Listener,
        mut close: oneshot::Receiver<()>,
    ) -> Result<(), ServeError> {
        tracing::info!(
            address = %listener.local_addr(),
            read_timeout = ?self.timeouts.read_timeout,
            write_timeout = ?self.timeouts.write_timeout,
            "HTTP server starting"
        );

        let builder = self.connection_builder();
        let mut backoff = Backoff::new(ACCEPT_BACKOFF_BASE, ACCEPT_BACKOFF_MAX);

        loop {
            let accepted = tokio::select! {
                biased;
                _ = &mut close => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer_addr)) => {
                    backoff.reset();
                    self.spawn_connection(&builder, stream, peer_addr);
                }
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "Connection failed during accept");
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    if backoff.failures() >= MAX_ACCEPT_FAILURES {
                        tracing::error!(
                            error = %e,
                            failures = backoff.failures(),
                            "Accept keeps failing, stopping listener"
                        );
                        return Err(ServeError::Accept(e));
                    }
                    tracing::warn!(error = %e, retry_in = ?delay, "Accept failed, retrying");
                    if backoff_or_close(&mut close, delay).await {
                        break;
                    }
                }
            }
        }

        drop(listener);
        tracing::info!(
            in_flight = self.connections.active_count(),
            "Listener closed, waiting for in-flight requests"
        );

        self.connections.begin_close();
        self.connections.wait_until_idle().await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn connection_builder(&self) -> auto::Builder<TokioExecutor> {
        let mut builder = auto::Builder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .max_buf_size(MAX_HEADER_BYTES);
        if let Some(limit) = self.timeouts.read_limit() {
            builder.http1().header_read_timeout(limit);
        }
        builder
            .http2()
            .timer(TokioTimer::new())
            .max_header_list_size(MAX_HEADER_BYTES as u32);
        builder
    }

    fn spawn_connection(
        &self,
        builder: &auto::Builder<TokioExecutor>,
        stream: TcpStream,
        peer_addr: SocketAddr,
    ) {
        let mut guard = self.connections.track();
        let connection_id = guard.id();
        let router = self.router.clone();
        let builder = builder.clone();

        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                router.clone().oneshot(request)
            });

            let conn = builder.serve_connection(io, service);
            tokio::pin!(conn);

            let mut closing = false;
            loop {
                tokio::select! {
                    result = conn.as_mut() => {
                        if let Err(e) = result {
                            tracing::debug!(
                                connection_id = %connection_id,
                                peer_addr = %peer_addr,
                                error = %e,
                                "Connection ended with error"
                            );
                        }
                        break;
                    }
                    _ = guard.closing(), if !closing => {
                        closing = true;
                        conn.as_mut().graceful_shutdown();
                    }
                }
            }

            drop(guard);
        });
    }
}

/// Wait out an accept backoff. Returns `true` if `close` fired first.
async fn backoff_or_close(close: &mut oneshot::Receiver<()>, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = close => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

/// Catch-all endpoint: read the body, call the function once, answer.
async fn invoke<H: Handler>(
    State(state): State<InvokeState<H>>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();

    let read = axum::body::to_bytes(body, usize::MAX);
    let body = match state.read_timeout {
        Some(limit) => match tokio::time::timeout(limit, read).await {
            Ok(read) => read,
            Err(_) => {
                tracing::warn!(limit = ?limit, "Request body not received in time");
                let response =
                    (StatusCode::REQUEST_TIMEOUT, "request body not received in time").into_response();
                return finish(&parts.method, start, response);
            }
        },
        None => read.await,
    };

    let body = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            let response = (StatusCode::BAD_REQUEST, "failed to read request body").into_response();
            return finish(&parts.method, start, response);
        }
    };

    let method = parts.method.clone();
    let request = FunctionRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        body,
    };

    let response = match state.handler.handle(request).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::warn!(
                status = %e.status(),
                reason = e.message(),
                "Function returned an error"
            );
            e.into_response()
        }
    };

    finish(&method, start, response)
}

fn finish(method: &Method, start: Instant, response: Response<Body>) -> Response<Body> {
    metrics::record_invocation(method.as_str(), response.status().as_u16(), start);
    response
}
