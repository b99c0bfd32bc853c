//! Runtime metrics for the upload service
//!
//! Tracks committed uploads, in-flight requests and admission pressure.
//!
//! # Consistency
//!
//! Counters and gauges share one `parking_lot::Mutex`, so a reader never sees
//! `uploads_total` bumped without the matching `upload_bytes_sum`. The lock is
//! synchronous and is never held across an `.await`, which lets
//! [`InProgressGuard`] release it from `Drop`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Monotonic counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Uploads committed to the store
    pub uploads_total: u64,
    /// Sum of committed payload sizes in bytes
    pub upload_bytes_sum: u64,
}

/// Point-in-time gauges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Gauges {
    /// Upload requests currently being handled
    pub requests_in_progress: i64,
    /// Admitted uploads in flight (or the limit, after a rejection)
    pub queue_len: usize,
}

/// Consistent copy of all metrics at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub uploads_total: u64,
    pub upload_bytes_sum: u64,
    pub requests_in_progress: i64,
    pub queue_len: usize,
    pub uptime_seconds: f64,
}

/// Shared metrics registry
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<MetricsRegistryInner>,
}

struct MetricsRegistryInner {
    state: Mutex<MetricsState>,
    started_at: Instant,
}

#[derive(Default)]
struct MetricsState {
    counters: Counters,
    gauges: Gauges,
}

impl MetricsRegistry {
    /// Create a registry; uptime is measured from this call
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsRegistryInner {
                state: Mutex::new(MetricsState::default()),
                started_at: Instant::now(),
            }),
        }
    }

    /// Record one committed upload of `bytes` bytes
    pub fn inc_uploads(&self, bytes: u64) {
        let mut state = self.inner.state.lock();
        state.counters.uploads_total += 1;
        state.counters.upload_bytes_sum += bytes;
    }

    pub fn inc_in_progress(&self) {
        self.inner.state.lock().gauges.requests_in_progress += 1;
    }

    pub fn dec_in_progress(&self) {
        self.inner.state.lock().gauges.requests_in_progress -= 1;
    }

    pub fn set_queue_len(&self, n: usize) {
        self.inner.state.lock().gauges.queue_len = n;
    }

    /// Increment `requests_in_progress` until the returned guard is dropped
    pub fn track_in_progress(&self) -> InProgressGuard {
        self.inc_in_progress();
        InProgressGuard {
            metrics: self.clone(),
        }
    }

    /// Time since the registry was created
    pub fn uptime(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    pub fn counters(&self) -> Counters {
        self.inner.state.lock().counters
    }

    pub fn gauges(&self) -> Gauges {
        self.inner.state.lock().gauges
    }

    /// Take a consistent snapshot of counters and gauges
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (counters, gauges) = {
            let state = self.inner.state.lock();
            (state.counters, state.gauges)
        };

        MetricsSnapshot {
            uploads_total: counters.uploads_total,
            upload_bytes_sum: counters.upload_bytes_sum,
            requests_in_progress: gauges.requests_in_progress,
            queue_len: gauges.queue_len,
            uptime_seconds: self.uptime().as_secs_f64(),
        }
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped in-flight marker returned by [`MetricsRegistry::track_in_progress`]
#[must_use = "the request stops being counted as soon as the guard is dropped"]
pub struct InProgressGuard {
    metrics: MetricsRegistry,
}

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        self.metrics.dec_in_progress();
    }
}
