//! Function handler contract.
//!
//! The runtime owns the transport; the function only sees a fully-read
//! [`FunctionRequest`] and answers with a [`FunctionResponse`] or a
//! [`HandlerError`]. Any async closure of the right shape is a [`Handler`].

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::future::Future;
use thiserror::Error;

/// One inbound request with its body already read.
#[derive(Debug, Clone)]
pub struct FunctionRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FunctionRequest {
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// `Host` header, falling back to the URI authority.
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri.host())
    }
}

/// What the function answers with.
#[derive(Debug, Clone)]
pub struct FunctionResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FunctionResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// 200 with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

impl IntoResponse for FunctionResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// A failure reported by the function.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    status: StatusCode,
    message: String,
}

impl HandlerError {
    /// A 500 carrying `message` as the response body.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Processes one request into one response.
pub trait Handler: Send + Sync + 'static {
    fn handle(
        &self,
        request: FunctionRequest,
    ) -> impl Future<Output = Result<FunctionResponse, HandlerError>> + Send;
}

impl<F, Fut> Handler for F
where
    F: Fn(FunctionRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<FunctionResponse, HandlerError>> + Send,
{
    fn handle(
        &self,
        request: FunctionRequest,
    ) -> impl Future<Output = Result<FunctionResponse, HandlerError>> + Send {
        self(request)
    }
}
