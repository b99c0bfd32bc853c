//! Request context middleware
//!
//! Tags every request with a request id and a trace id, runs the handler
//! inside a span carrying both, logs completion, and echoes the ids back.
//!
//! - `x-request-id`: taken from the request when present, otherwise generated
//! - `traceparent`: trace id from an incoming W3C header, otherwise generated
//! - `x-api-version`: the configured API version

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const API_VERSION_HEADER: &str = "x-api-version";

/// API version echoed on every response
#[derive(Debug, Clone)]
pub struct ApiVersion(HeaderValue);

impl ApiVersion {
    /// Falls back to the crate version when `version` is not a valid header value
    pub fn new(version: &str) -> Self {
        match HeaderValue::from_str(version) {
            Ok(value) => Self(value),
            Err(_) => {
                tracing::warn!(version = %version, "Invalid API_VERSION, using crate version");
                Self(HeaderValue::from_static(env!("CARGO_PKG_VERSION")))
            }
        }
    }
}

/// 32 lowercase hex characters
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Trace id field of a `traceparent` header (`version-traceid-parentid-flags`)
pub fn trace_id_from_traceparent(value: &str) -> Option<&str> {
    value.split('-').nth(1).filter(|id| !id.is_empty())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn request_context(
    State(api_version): State<ApiVersion>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = header_str(request.headers(), REQUEST_ID_HEADER)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_id);
    let trace_id = header_str(request.headers(), TRACEPARENT_HEADER)
        .and_then(|tp| trace_id_from_traceparent(&tp).map(str::to_string))
        .unwrap_or_else(new_id);

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let span = tracing::info_span!("request", request_id = %request_id, trace_id = %trace_id);
    let mut response = next.run(request).instrument(span.clone()).await;

    let duration_ms = started.elapsed().as_millis() as u64;
    span.in_scope(|| {
        tracing::info!(
            method = %method,
            path = %path,
            status_code = response.status().as_u16(),
            duration_ms = duration_ms,
            "request done"
        );
    });

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("00-{}-0000000000000000-01", trace_id)) {
        headers.insert(HeaderName::from_static(TRACEPARENT_HEADER), value);
    }
    headers.insert(HeaderName::from_static(API_VERSION_HEADER), api_version.0);

    response
}
