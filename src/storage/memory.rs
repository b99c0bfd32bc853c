//! In-memory file store
//!
//! Keeps every payload in a `HashMap` behind a `tokio::sync::RwLock`.
//! Each entry carries an insertion sequence number so listing stays
//! deterministic when two uploads share a timestamp.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::RwLock;

use super::types::{FileStore, StorageError, StoredFile};

/// Thread-safe in-memory implementation of [`FileStore`]
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    /// name -> (insertion sequence, entry)
    files: HashMap<String, (u64, StoredFile)>,
    next_seq: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FileStore for MemoryStore {
    async fn save(
        &self,
        name: &str,
        content_type: &str,
        payload: Bytes,
    ) -> Result<StoredFile, StorageError> {
        // Build the entry completely before it becomes visible
        let file = StoredFile::new(name, content_type, payload);

        let mut state = self.inner.state.write().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        if state.files.insert(name.to_string(), (seq, file.clone())).is_some() {
            tracing::debug!(name = %name, "Replaced existing entry");
        }

        Ok(file)
    }

    async fn get(&self, name: &str) -> Result<Option<StoredFile>, StorageError> {
        let state = self.inner.state.read().await;
        Ok(state.files.get(name).map(|(_, file)| file.clone()))
    }

    async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut entries: Vec<(u64, StoredFile)> = {
            let state = self.inner.state.read().await;
            state.files.values().cloned().collect()
        };

        entries.sort_by(|(seq_a, a), (seq_b, b)| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| seq_b.cmp(seq_a))
        });

        Ok(entries.into_iter().map(|(_, file)| file).collect())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let mut state = self.inner.state.write().await;
        let removed = state.files.len();
        state.files.clear();
        tracing::info!(removed = removed, "Cleared file store");
        Ok(())
    }

    async fn len(&self) -> Result<usize, StorageError> {
        Ok(self.inner.state.read().await.files.len())
    }
}
