//! Request spans.
//!
//! Every API request runs inside a span tagged with its `x-request-id`, so
//! log lines from handlers and spawned work can be correlated.

use axum::http::Request;
use tower_http::request_id::RequestId;

/// Span for one request. Used as the `TraceLayer` span maker.
pub fn request_span<B>(request: &Request<B>) -> ::tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown");
    ::tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_span_for_request_without_id() {
        let request = Request::get("/api/status").body(()).unwrap();
        let _span = request_span(&request);
    }

    #[test]
    fn test_span_reads_request_id_extension() {
        let mut request = Request::get("/api/status").body(()).unwrap();
        request
            .extensions_mut()
            .insert(RequestId::new(HeaderValue::from_static("abc-123")));
        let _span = request_span(&request);
    }
}
