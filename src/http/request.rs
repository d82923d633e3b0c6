//! Call ID assignment.
//!
//! # Responsibilities
//! - Give every inbound request an `X-Call-Id` (UUID v4) before it reaches
//!   the function, unless the caller already supplied one
//!
//! # Design Decisions
//! - Added as the outermost layer so the `Invoke` span can record it
//! - A caller-supplied ID is kept verbatim for end-to-end correlation

use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId, SetRequestIdLayer};
use uuid::Uuid;

/// Header carrying the call ID.
pub const X_CALL_ID: &str = "x-call-id";

/// Generates a fresh UUID v4 call ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeCallId;

impl MakeRequestId for MakeCallId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Layer setting `X-Call-Id` on requests that lack it.
pub fn call_id_layer() -> SetRequestIdLayer<MakeCallId> {
    SetRequestIdLayer::new(HeaderName::from_static(X_CALL_ID), MakeCallId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceBuilder, ServiceExt};

    async fn echo_call_id(req: Request<Body>) -> Result<axum::http::Response<String>, Infallible> {
        Ok(axum::http::Response::new(
            req.headers()
                .get(X_CALL_ID)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string(),
        ))
    }

    #[tokio::test]
    async fn assigns_uuid_when_missing() {
        let svc = ServiceBuilder::new()
            .layer(call_id_layer())
            .service(service_fn(echo_call_id));

        let seen = svc
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap()
            .into_body();
        assert!(Uuid::parse_str(&seen).is_ok(), "got {seen:?}");
    }

    #[tokio::test]
    async fn keeps_existing_call_id() {
        let svc = ServiceBuilder::new()
            .layer(call_id_layer())
            .service(service_fn(echo_call_id));

        let req = Request::builder()
            .header(X_CALL_ID, "caller-supplied")
            .body(Body::empty())
            .unwrap();
        let seen = svc.oneshot(req).await.unwrap().into_body();
        assert_eq!(seen, "caller-supplied");
    }
}
