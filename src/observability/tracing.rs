//! Request spans.
//!
//! Every request runs inside an `Invoke` span carrying method, path and call
//! ID. Span creation is local and synchronous, so it cannot block or fail the
//! request.

use axum::http::Request;
use tower_http::trace::{HttpMakeClassifier, MakeSpan, TraceLayer};
use tracing::Span;

use crate::http::request::X_CALL_ID;

/// Builds the `Invoke` span for each request.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeSpan;

impl<B> MakeSpan<B> for InvokeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let call_id = request
            .headers()
            .get(X_CALL_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "Invoke",
            method = %request.method(),
            path = %request.uri().path(),
            call_id = %call_id,
        )
    }
}

/// Trace layer wrapping the handler in an `Invoke` span.
pub fn invoke_trace_layer() -> TraceLayer<HttpMakeClassifier, InvokeSpan> {
    TraceLayer::new_for_http().make_span_with(InvokeSpan)
}
