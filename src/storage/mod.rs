//! Storage module for uploaded payloads
//!
//! Backends implement [`FileStore`]. The in-memory backend is the real one;
//! the S3 backend is a stand-in that keeps payloads in memory behind its own
//! type until an object-store client is wired in.

mod memory;
mod s3_stub;
mod types;

use std::sync::Arc;

pub use memory::MemoryStore;
pub use s3_stub::S3StubStore;
pub use types::*;

/// Build the store selected by configuration
pub fn make_store(backend: FileBackend) -> Arc<dyn FileStore> {
    match backend {
        FileBackend::Memory => Arc::new(MemoryStore::new()),
        FileBackend::S3Stub => Arc::new(S3StubStore::new()),
    }
}
