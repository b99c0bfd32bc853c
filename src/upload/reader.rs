//! Bounded Stream Reader
//!
//! Turns a chunked byte source into one payload under two limits:
//! - Size: checked after every chunk against the bytes actually received
//! - Time: one deadline covers the whole multi-chunk read
//!
//! On either failure the accumulator is dropped; nothing partial escapes.

use std::time::Duration;

use axum::body::Bytes;
use axum::extract::multipart::Field;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::types::{UploadError, READ_CHUNK_SIZE};

// ============================================================================
// Chunk Sources
// ============================================================================

/// A pull-based source of payload bytes
#[async_trait::async_trait]
pub trait ChunkSource: Send {
    /// Next chunk of at most `max_len` bytes, or `None` at end of stream
    async fn next_chunk(&mut self, max_len: usize) -> Result<Option<Bytes>, UploadError>;
}

/// Adapts any `AsyncRead` into a [`ChunkSource`]
pub struct ReaderSource<R> {
    reader: R,
}

impl<R> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

#[async_trait::async_trait]
impl<R> ChunkSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_chunk(&mut self, max_len: usize) -> Result<Option<Bytes>, UploadError> {
        let mut buf = vec![0u8; max_len];
        let n = self
            .reader
            .read(&mut buf)
            .await
            .map_err(|e| UploadError::SourceFailed(e.to_string()))?;

        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}

/// Reads one multipart field, re-slicing its chunks to the requested size
pub struct MultipartSource<'a> {
    field: Field<'a>,
    pending: Bytes,
}

impl<'a> MultipartSource<'a> {
    pub fn new(field: Field<'a>) -> Self {
        Self {
            field,
            pending: Bytes::new(),
        }
    }
}

#[async_trait::async_trait]
impl<'a> ChunkSource for MultipartSource<'a> {
    async fn next_chunk(&mut self, max_len: usize) -> Result<Option<Bytes>, UploadError> {
        while self.pending.is_empty() {
            match self
                .field
                .chunk()
                .await
                .map_err(|e| UploadError::SourceFailed(e.to_string()))?
            {
                Some(chunk) => self.pending = chunk,
                None => return Ok(None),
            }
        }

        let take = max_len.min(self.pending.len());
        Ok(Some(self.pending.split_to(take)))
    }
}

// ============================================================================
// Bounded Read
// ============================================================================

/// Read `source` to completion within `max_bytes` and `timeout`
///
/// An empty source yields an empty payload.
pub async fn read_bounded<S>(
    source: &mut S,
    max_bytes: u64,
    timeout: Duration,
) -> Result<Bytes, UploadError>
where
    S: ChunkSource + ?Sized,
{
    let read = async {
        let mut buf: Vec<u8> = Vec::new();

        while let Some(chunk) = source.next_chunk(READ_CHUNK_SIZE).await? {
            buf.extend_from_slice(&chunk);
            if buf.len() as u64 > max_bytes {
                tracing::debug!(
                    received = buf.len(),
                    max_bytes = max_bytes,
                    "Payload exceeded size limit"
                );
                return Err(UploadError::PayloadTooLarge { max: max_bytes });
            }
        }

        Ok(Bytes::from(buf))
    };

    match tokio::time::timeout(timeout, read).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Upload read timed out");
            Err(UploadError::ReadTimeout {
                timeout_secs: timeout.as_secs(),
            })
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
