//! Upload types shared by the admission, read and commit stages

use std::time::Duration;

use crate::storage::StorageError;

// ============================================================================
// Constants
// ============================================================================

/// Read granularity for incoming payloads: 64KB
pub const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Default maximum payload size: 10MB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of uploads admitted at once
pub const DEFAULT_CONCURRENT_UPLOADS: usize = 100;

/// Default wall-clock budget for reading one payload
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Advisory delay returned to shed clients
pub const RETRY_AFTER_SECS: u64 = 1;

/// Length of the random suffix appended on a name collision
pub const COLLISION_SUFFIX_LEN: usize = 6;

// ============================================================================
// Limits
// ============================================================================

/// Resource bounds applied to every upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Size of the admission permit pool
    pub concurrent_uploads: usize,
    /// Largest accepted payload, inclusive
    pub max_upload_bytes: u64,
    /// Deadline for reading the whole payload
    pub read_timeout: Duration,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            concurrent_uploads: DEFAULT_CONCURRENT_UPLOADS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Classified upload outcomes
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid filename")]
    InvalidName,

    #[error("File too large (max: {max} bytes)")]
    PayloadTooLarge { max: u64 },

    #[error("Upload timed out after {timeout_secs}s")]
    ReadTimeout { timeout_secs: u64 },

    #[error("Server busy: {queue_len} uploads in flight, retry in {retry_after_secs}s")]
    Backpressure {
        queue_len: usize,
        retry_after_secs: u64,
    },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Upload stream failed: {0}")]
    SourceFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl UploadError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_filename",
            Self::PayloadTooLarge { .. } => "file_too_large",
            Self::ReadTimeout { .. } => "upload_timeout",
            Self::Backpressure { .. } => "server_busy",
            Self::NotFound(_) => "not_found",
            Self::SourceFailed(_) => "bad_upload_stream",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::InvalidName => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ReadTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            Self::Backpressure { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::SourceFailed(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidName => "invalid filename".to_string(),
            Self::PayloadTooLarge { max } => format!("file too large (max {max} bytes)"),
            Self::ReadTimeout { .. } => "upload timed out".to_string(),
            Self::Backpressure { .. } => "server busy, retry later".to_string(),
            Self::NotFound(name) => format!("file not found: {name}"),
            Self::SourceFailed(_) => "upload stream was interrupted".to_string(),
            Self::Storage(_) => "internal error".to_string(),
        }
    }
}

