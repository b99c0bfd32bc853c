//! S3 stand-in store
//!
//! Accepts the `s3` backend selection without an object-store client. Every
//! call is forwarded to an inner [`MemoryStore`], so the coordinator sees the
//! same semantics it would from a real bucket keyed by name.

use axum::body::Bytes;

use super::memory::MemoryStore;
use super::types::{FileStore, StorageError, StoredFile};

#[derive(Clone, Default)]
pub struct S3StubStore {
    inner: MemoryStore,
}

impl S3StubStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FileStore for S3StubStore {
    async fn save(
        &self,
        name: &str,
        content_type: &str,
        payload: Bytes,
    ) -> Result<StoredFile, StorageError> {
        tracing::debug!(key = %name, "S3 stub put");
        self.inner.save(name, content_type, payload).await
    }

    async fn get(&self, name: &str) -> Result<Option<StoredFile>, StorageError> {
        self.inner.get(name).await
    }

    async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        self.inner.list().await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear().await
    }

    async fn len(&self) -> Result<usize, StorageError> {
        self.inner.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{make_store, FileBackend};

    #[tokio::test]
    async fn test_delegates_to_memory() {
        let store = S3StubStore::new();
        store
            .save("a.txt", "text/plain", Bytes::from_static(b"one"))
            .await
            .unwrap();
        store
            .save("b.txt", "text/plain", Bytes::from_static(b"two"))
            .await
            .unwrap();

        let fetched = store.get("a.txt").await.unwrap().unwrap();
        assert_eq!(fetched.payload, Bytes::from_static(b"one"));
        assert_eq!(store.len().await.unwrap(), 2);

        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);

        store.clear().await.unwrap();
        assert!(store.get("a.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_make_store_s3_backend() {
        let store = make_store(FileBackend::S3Stub);
        store
            .save("k.bin", "application/octet-stream", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert_eq!(store.len().await.unwrap(), 1);
    }
}
