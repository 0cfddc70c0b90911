//! Request identification and accounting.
//!
//! Request IDs are assigned by `tower_http::request_id` (UUID v4) as early as
//! possible and echoed back on the response. This module holds the header
//! name and the per-route metrics middleware.

use axum::extract::{MatchedPath, Request};
use axum::http::HeaderName;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

use crate::observability::metrics;

/// The standard header name for request IDs.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Count the request and its latency under its route template.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), started);
    response
}
