//! Upload Coordinator
//!
//! Drives one upload through its stages:
//!
//! ```text
//! Start -> Admitting -> (Rejected | Admitted) -> Reading
//!       -> (TooLarge | TimedOut | ReadOK) -> Committing -> Committed
//! ```
//!
//! The name is sanitized before admission so an unnameable upload never takes
//! a permit. The permit is held from the read through the commit and released
//! on drop. Metrics are recorded only after the dedupe section is released,
//! so the hot path never holds that section and the metrics lock together.

use std::sync::Arc;

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::storage::{FileStore, StoredFile};
use super::admission::AdmissionController;
use super::reader::{read_bounded, ChunkSource};
use super::resolver::{sanitize, NameResolver};
use super::types::{UploadError, UploadLimits};

/// Orchestrates admission, bounded read, and deduplicated commit
#[derive(Clone)]
pub struct UploadCoordinator {
    inner: Arc<UploadCoordinatorInner>,
}

struct UploadCoordinatorInner {
    limits: UploadLimits,
    admission: AdmissionController,
    resolver: NameResolver,
    store: Arc<dyn FileStore>,
    metrics: MetricsRegistry,
}

impl UploadCoordinator {
    /// Build a coordinator over `store`, reporting into `metrics`
    pub fn new(limits: UploadLimits, store: Arc<dyn FileStore>, metrics: MetricsRegistry) -> Self {
        Self {
            inner: Arc::new(UploadCoordinatorInner {
                limits,
                admission: AdmissionController::new(limits.concurrent_uploads, metrics.clone()),
                resolver: NameResolver::new(),
                store,
                metrics,
            }),
        }
    }

    /// Admit, read, and commit one upload
    ///
    /// Returns the committed entry, whose `name` may differ from the requested
    /// one when it had to be sanitized or de-duplicated.
    pub async fn admit_and_store<S>(
        &self,
        raw_name: &str,
        content_type: &str,
        source: &mut S,
    ) -> Result<StoredFile, UploadError>
    where
        S: ChunkSource + ?Sized,
    {
        let _in_progress = self.inner.metrics.track_in_progress();

        let safe_name = sanitize(raw_name).map_err(|e| {
            tracing::info!(raw_name = %raw_name, "Rejected unnameable upload");
            e
        })?;

        let permit = self.inner.admission.try_admit().await?;

        let payload = read_bounded(
            source,
            self.inner.limits.max_upload_bytes,
            self.inner.limits.read_timeout,
        )
        .await?;

        let stored = self
            .inner
            .resolver
            .resolve_and_commit(&safe_name, content_type, payload, self.inner.store.as_ref())
            .await?;

        self.inner.metrics.inc_uploads(stored.size);
        drop(permit);

        tracing::info!(
            name = %stored.name,
            size = stored.size,
            content_type = %stored.content_type,
            "Upload committed"
        );

        Ok(stored)
    }

    /// All stored files, newest first
    pub async fn list(&self) -> Result<Vec<StoredFile>, UploadError> {
        Ok(self.inner.store.list().await?)
    }

    /// Fetch a stored file by its resolved name
    pub async fn get(&self, name: &str) -> Result<StoredFile, UploadError> {
        self.inner
            .store
            .get(name)
            .await?
            .ok_or_else(|| UploadError::NotFound(name.to_string()))
    }

    /// Drop every stored file (administrative reset)
    pub async fn clear(&self) -> Result<(), UploadError> {
        Ok(self.inner.store.clear().await?)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.inner.metrics
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.inner.admission
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use axum::body::Bytes;
    use futures::future::join_all;

    use crate::storage::MemoryStore;
    use crate::upload::reader::ReaderSource;

    fn coordinator(limits: UploadLimits) -> UploadCoordinator {
        UploadCoordinator::new(limits, Arc::new(MemoryStore::new()), MetricsRegistry::new())
    }

    fn limits(concurrent: usize, max_bytes: u64, timeout: Duration) -> UploadLimits {
        UploadLimits {
            concurrent_uploads: concurrent,
            max_upload_bytes: max_bytes,
            read_timeout: timeout,
        }
    }

    async fn upload(
        coordinator: &UploadCoordinator,
        name: &str,
        data: &[u8],
    ) -> Result<StoredFile, UploadError> {
        let mut source = ReaderSource::new(data);
        coordinator.admit_and_store(name, "text/plain", &mut source).await
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let coordinator = coordinator(UploadLimits::default());

        let stored = upload(&coordinator, "hello.txt", b"hello").await.unwrap();
        assert_eq!(stored.name, "hello.txt");
        assert_eq!(stored.size, 5);

        let fetched = coordinator.get(&stored.name).await.unwrap();
        assert_eq!(fetched.payload, Bytes::from_static(b"hello"));
        assert_eq!(fetched.content_type, "text/plain");

        let snapshot = coordinator.metrics_snapshot();
        assert_eq!(snapshot.uploads_total, 1);
        assert_eq!(snapshot.upload_bytes_sum, 5);
        assert_eq!(snapshot.requests_in_progress, 0);
        assert_eq!(snapshot.queue_len, 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let coordinator = coordinator(UploadLimits::default());
        assert!(matches!(
            coordinator.get("ghost.txt").await,
            Err(UploadError::NotFound(name)) if name == "ghost.txt"
        ));
    }

    #[tokio::test]
    async fn test_concurrent_distinct_names() {
        let coordinator = coordinator(UploadLimits::default());

        let names: Vec<String> = (0..10).map(|i| format!("f{}.txt", i)).collect();
        let results = join_all(names.iter().map(|name| upload(&coordinator, name, b"data"))).await;

        let committed: HashSet<String> = results.into_iter().map(|r| r.unwrap().name).collect();
        let expected: HashSet<String> = names.into_iter().collect();
        assert_eq!(committed, expected);

        let listed: HashSet<String> = coordinator
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(listed, expected);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_names() {
        let coordinator = coordinator(UploadLimits::default());

        let (a, b) = tokio::join!(
            upload(&coordinator, "dup.txt", b"one"),
            upload(&coordinator, "dup.txt", b"two"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.name, b.name);
        assert!(a.name.starts_with("dup"));
        assert!(b.name.starts_with("dup"));
        assert_eq!(coordinator.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_size_boundary() {
        let coordinator = coordinator(limits(4, 16, Duration::from_secs(5)));

        assert!(upload(&coordinator, "exact.bin", &[0u8; 16]).await.is_ok());
        assert!(matches!(
            upload(&coordinator, "over.bin", &[0u8; 17]).await,
            Err(UploadError::PayloadTooLarge { max: 16 })
        ));

        let snapshot = coordinator.metrics_snapshot();
        assert_eq!(snapshot.uploads_total, 1);
        assert_eq!(snapshot.upload_bytes_sum, 16);
        assert_eq!(snapshot.requests_in_progress, 0);
        assert_eq!(coordinator.admission().available(), 4);
    }

    #[tokio::test]
    async fn test_timeout_leaves_no_entry() {
        let coordinator = coordinator(limits(4, 1024, Duration::from_millis(50)));
        let (_client, server) = tokio::io::duplex(64);
        let mut source = ReaderSource::new(server);

        let result = coordinator
            .admit_and_store("slow.txt", "text/plain", &mut source)
            .await;

        assert!(matches!(result, Err(UploadError::ReadTimeout { .. })));
        assert!(coordinator.list().await.unwrap().is_empty());
        assert_eq!(coordinator.metrics_snapshot().uploads_total, 0);
        assert_eq!(coordinator.metrics_snapshot().requests_in_progress, 0);
        assert_eq!(coordinator.admission().available(), 4);
    }

    #[tokio::test]
    async fn test_invalid_name_skips_admission() {
        let coordinator = coordinator(limits(1, 1024, Duration::from_secs(5)));
        let _held = coordinator.admission().try_admit().await.unwrap();

        // Pool is saturated, but the name check comes first
        assert!(matches!(
            upload(&coordinator, "../..", b"x").await,
            Err(UploadError::InvalidName)
        ));
        assert_eq!(coordinator.metrics_snapshot().requests_in_progress, 0);
    }

    #[tokio::test]
    async fn test_arbitrary_names_are_clean_or_rejected() {
        let coordinator = coordinator(UploadLimits::default());
        let long_name = "x".repeat(4096);
        let names = [
            "",
            ".",
            "\0",
            "nul\0byte.txt",
            "\u{1}\u{7f}\u{1b}[31m",
            "line\r\nbreak.txt",
            "a/b\\c/../d.txt",
            "C:\\Windows\\..\\aux",
            "\u{202e}gnp.exe",
            "é/è/ê",
            long_name.as_str(),
        ];

        for raw in names {
            match upload(&coordinator, raw, b"x").await {
                Ok(stored) => {
                    assert!(!stored.name.is_empty(), "{:?}", raw);
                    assert!(
                        !stored.name.contains(|c: char| c == '/' || c == '\\'),
                        "{:?} -> {:?}",
                        raw,
                        stored.name
                    );
                    assert!(
                        !stored.name.chars().any(char::is_control),
                        "{:?} -> {:?}",
                        raw,
                        stored.name
                    );
                }
                Err(UploadError::InvalidName) => {}
                Err(other) => panic!("{:?} failed with {:?}", raw, other),
            }
        }
    }

    #[tokio::test]
    async fn test_saturated_pool_sheds() {
        let coordinator = coordinator(limits(2, 1024, Duration::from_secs(5)));
        let _a = coordinator.admission().try_admit().await.unwrap();
        let _b = coordinator.admission().try_admit().await.unwrap();

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            upload(&coordinator, "late.txt", b"x"),
        )
        .await
        .expect("shedding must not block");

        assert!(matches!(result, Err(UploadError::Backpressure { queue_len: 2, .. })));
        let snapshot = coordinator.metrics_snapshot();
        assert_eq!(snapshot.queue_len, 2);
        assert_eq!(snapshot.requests_in_progress, 0);
        assert!(coordinator.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let coordinator = coordinator(UploadLimits::default());
        upload(&coordinator, "a.txt", b"x").await.unwrap();
        upload(&coordinator, "b.txt", b"x").await.unwrap();

        let names: Vec<String> = coordinator
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
    }

    #[tokio::test]
    async fn test_clear() {
        let coordinator = coordinator(UploadLimits::default());
        upload(&coordinator, "a.txt", b"x").await.unwrap();
        coordinator.clear().await.unwrap();
        assert!(coordinator.list().await.unwrap().is_empty());
    }
}
