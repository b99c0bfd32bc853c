//! Upload Routes
//!
//! Endpoints:
//! - POST /api/v1/upload - Multipart upload, field `file`

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::FileMeta;
use crate::upload::{MultipartSource, UploadError};

/// Multipart field carrying the payload
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub file: FileMeta,
}

/// Create the upload router
///
/// The default body limit is disabled here; the bounded reader enforces the
/// configured maximum on the bytes actually received. No other part is read,
/// so the `file` part is the only one whose bytes are ever consumed.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(upload))
        .layer(DefaultBodyLimit::disable())
}

/// POST /api/v1/upload
///
/// Streams the `file` part through the upload coordinator. Any other part is
/// rejected before its body is read, and waiting for the part headers counts
/// against the read timeout.
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let read_timeout = state.config().upload_limits().read_timeout;

    let field = tokio::time::timeout(read_timeout, multipart.next_field())
        .await
        .map_err(|_| UploadError::ReadTimeout {
            timeout_secs: read_timeout.as_secs(),
        })?
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {}", e)))?
        .ok_or_else(|| AppError::BadRequest("missing file field".to_string()))?;

    if field.name() != Some(FILE_FIELD) {
        let name = field.name().unwrap_or_default().to_string();
        tracing::info!(field = %name, "Rejected upload with unexpected multipart field");
        return Err(AppError::BadRequest(format!(
            "missing file field (unexpected field {:?})",
            name
        )));
    }

    let raw_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .map(str::to_string)
        .unwrap_or_else(|| guess_content_type(&raw_name));

    tracing::debug!(
        raw_name = %raw_name,
        content_type = %content_type,
        "Receiving upload"
    );

    let mut source = MultipartSource::new(field);
    let stored = state
        .uploads()
        .admit_and_store(&raw_name, &content_type, &mut source)
        .await?;

    Ok(Json(UploadResponse {
        ok: true,
        file: stored.meta(),
    }))
}

/// Guess content type from file extension
fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
