//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::metrics::MetricsRegistry;
use crate::storage::{make_store, FileStore};
use crate::upload::UploadCoordinator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    coordinator: UploadCoordinator,
}

impl AppState {
    /// Create application state with the store selected by `config`
    pub fn new(config: Config) -> Self {
        let store = make_store(config.uploads.file_backend);
        Self::with_store(config, store)
    }

    /// Create application state over an explicit store
    pub fn with_store(config: Config, store: Arc<dyn FileStore>) -> Self {
        let coordinator = UploadCoordinator::new(config.upload_limits(), store, MetricsRegistry::new());

        Self {
            inner: Arc::new(AppStateInner { config, coordinator }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the upload coordinator
    pub fn uploads(&self) -> &UploadCoordinator {
        &self.inner.coordinator
    }
}
