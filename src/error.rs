//! Error types for the Filedrop HTTP boundary

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::upload::UploadError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: Option<String>) -> Self {
        Self {
            ok: false,
            error: error.to_string(),
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Upload(UploadError::Storage(e)) => {
                tracing::error!("Storage error: {}", e);
                internal_error()
            }
            AppError::Upload(e) => {
                let status = e.status_code();
                let body = Json(ErrorResponse::new(e.code(), Some(e.public_message())));
                let mut response = (status, body).into_response();

                if let UploadError::Backpressure { retry_after_secs, .. } = e {
                    response
                        .headers_mut()
                        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                }
                response
            }
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("bad_request", Some(msg))),
            )
                .into_response(),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("not_found", Some(msg))),
            )
                .into_response(),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                internal_error()
            }
        }
    }
}

/// The single generic failure surfaced for anything unclassified
fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("internal_error", None)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_status_mapping() {
        let cases = [
            (UploadError::InvalidName, StatusCode::BAD_REQUEST),
            (UploadError::PayloadTooLarge { max: 1 }, StatusCode::PAYLOAD_TOO_LARGE),
            (UploadError::ReadTimeout { timeout_secs: 1 }, StatusCode::REQUEST_TIMEOUT),
            (UploadError::NotFound("x".into()), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_backpressure_sets_retry_after() {
        let response = AppError::from(UploadError::Backpressure {
            queue_len: 3,
            retry_after_secs: 2,
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }

    #[test]
    fn test_internal_is_generic() {
        let response = AppError::Internal("db exploded".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
