//! File listing and download routes
//!
//! Endpoints:
//! - GET /api/v1/files - Metadata for every stored file, newest first
//! - GET /api/v1/files/:name - Raw payload of one file

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::FileMeta;

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub ok: bool,
    pub files: Vec<FileMeta>,
}

/// Create the files router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_files))
        .route("/:name", get(download_file))
}

/// GET /api/v1/files
async fn list_files(State(state): State<AppState>) -> Result<Json<FileListResponse>> {
    let files = state.uploads().list().await?;

    Ok(Json(FileListResponse {
        ok: true,
        files: files.iter().map(FileMeta::from).collect(),
    }))
}

/// GET /api/v1/files/:name
async fn download_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let file = state.uploads().get(&name).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type.as_str())
        .header(header::CONTENT_LENGTH, file.size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.name),
        )
        .body(Body::from(file.payload))
        .map_err(|e| AppError::Internal(e.to_string()))
}
