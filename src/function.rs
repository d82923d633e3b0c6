//! Default function: echoes the request body.

use crate::http::handler::{FunctionRequest, FunctionResponse, HandlerError};

pub async fn echo(request: FunctionRequest) -> Result<FunctionResponse, HandlerError> {
    tracing::debug!(bytes = request.body.len(), "Request payload received");
    let input = String::from_utf8_lossy(&request.body);
    Ok(FunctionResponse::ok(format!("Hello world, input was: {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};

    #[tokio::test]
    async fn echoes_input() {
        let request = FunctionRequest {
            method: Method::POST,
            uri: "/".parse().unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"ping"),
        };
        let response = echo(request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"Hello world, input was: ping");
    }
}
