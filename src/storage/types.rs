//! Storage types

use std::str::FromStr;

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A committed upload
///
/// Entries are immutable once saved; `size` always equals `payload.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub payload: Bytes,
}

impl StoredFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, payload: Bytes) -> Self {
        Self {
            name: name.into(),
            size: payload.len() as u64,
            content_type: content_type.into(),
            uploaded_at: Utc::now(),
            payload,
        }
    }

    /// Metadata view without the payload
    pub fn meta(&self) -> FileMeta {
        FileMeta::from(self)
    }
}

/// Public metadata for a stored file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    /// Epoch seconds
    pub uploaded_at: f64,
}

impl From<&StoredFile> for FileMeta {
    fn from(file: &StoredFile) -> Self {
        Self {
            name: file.name.clone(),
            size: file.size,
            content_type: file.content_type.clone(),
            uploaded_at: file.uploaded_at.timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}

/// Storage backend selection
///
/// `memory` selects [`MemoryStore`](super::MemoryStore); any other non-empty
/// value selects the S3 stand-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileBackend {
    #[default]
    Memory,
    #[serde(rename = "s3")]
    S3Stub,
}

impl FromStr for FileBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(FileBackend::Memory),
            "" => Err(StorageError::UnknownBackend(s.to_string())),
            "s3" => Ok(FileBackend::S3Stub),
            other => {
                tracing::warn!(backend = %other, "Unrecognized FILE_BACKEND, using the S3 stub");
                Ok(FileBackend::S3Stub)
            }
        }
    }
}

/// Storage-specific errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unknown storage backend: {0:?}")]
    UnknownBackend(String),
}

/// Keyed repository of stored payloads
///
/// Implementations synchronize internally: `save` must be atomic with respect
/// to concurrent `get`/`list`, whatever locks the caller already holds.
#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    /// Store `payload` under `name`, replacing any entry with that name
    async fn save(
        &self,
        name: &str,
        content_type: &str,
        payload: Bytes,
    ) -> Result<StoredFile, StorageError>;

    /// Look up an entry by exact name
    async fn get(&self, name: &str) -> Result<Option<StoredFile>, StorageError>;

    /// All entries, most recently uploaded first
    async fn list(&self) -> Result<Vec<StoredFile>, StorageError>;

    /// Remove every entry
    async fn clear(&self) -> Result<(), StorageError>;

    /// Number of live entries
    async fn len(&self) -> Result<usize, StorageError>;
}
