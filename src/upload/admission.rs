//! Admission Controller
//!
//! Bounds how many uploads hold a payload in memory at once:
//! - Fixed pool of permits backed by a `tokio::sync::Semaphore`
//! - Saturated pool sheds the request immediately instead of queueing it
//! - Permits release on drop, so every exit path gives capacity back
//!
//! The saturation check and the acquire are two steps. Two requests can both
//! see one free permit; the loser then waits on `acquire` until a permit is
//! returned rather than being shed.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::metrics::MetricsRegistry;
use super::types::{UploadError, RETRY_AFTER_SECS};

// ============================================================================
// Admission Controller
// ============================================================================

/// Gates the number of concurrently admitted uploads
#[derive(Clone)]
pub struct AdmissionController {
    inner: Arc<AdmissionControllerInner>,
}

struct AdmissionControllerInner {
    /// Capacity pool
    permits: Arc<Semaphore>,

    /// Pool size
    limit: usize,

    /// Receives the queue length gauge
    metrics: MetricsRegistry,
}

impl AdmissionController {
    /// Create a controller with `limit` permits
    pub fn new(limit: usize, metrics: MetricsRegistry) -> Self {
        Self {
            inner: Arc::new(AdmissionControllerInner {
                permits: Arc::new(Semaphore::new(limit)),
                limit,
                metrics,
            }),
        }
    }

    /// Admit the caller or shed it
    ///
    /// Returns [`UploadError::Backpressure`] without waiting when no permit is
    /// free at the time of the check.
    pub async fn try_admit(&self) -> Result<AdmissionPermit, UploadError> {
        let limit = self.inner.limit;

        if self.inner.permits.available_permits() == 0 {
            self.inner.metrics.set_queue_len(limit);
            tracing::warn!(limit = limit, "Admission pool saturated, shedding upload");
            return Err(UploadError::Backpressure {
                queue_len: limit,
                retry_after_secs: RETRY_AFTER_SECS,
            });
        }

        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| UploadError::Backpressure {
                queue_len: limit,
                retry_after_secs: RETRY_AFTER_SECS,
            })?;

        let in_flight = limit - self.inner.permits.available_permits();
        self.inner.metrics.set_queue_len(in_flight);

        tracing::debug!(in_flight = in_flight, limit = limit, "Upload admitted");

        Ok(AdmissionPermit { _permit: permit })
    }

    /// Configured pool size
    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }
}

// ============================================================================
// Permit
// ============================================================================

/// Capacity token held from the bounded read through the commit
#[derive(Debug)]
#[must_use = "dropping the permit releases the admission slot"]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

// ============================================================================
// Tests
// ============================================================================
