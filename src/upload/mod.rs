//! Upload Module
//!
//! Implements bounded, collision-safe uploads with:
//! - Admission control over a fixed permit pool (load shedding, no queue)
//! - Size- and deadline-bounded payload reads
//! - Filename sanitization and serialized collision resolution
//!
//! Flow:
//! 1. Sanitize the requested name
//! 2. Take an admission permit or shed the request
//! 3. Read the payload under size and time limits
//! 4. Resolve a free name and commit to the store
//! 5. Record metrics and release the permit

pub mod admission;
pub mod coordinator;
pub mod reader;
pub mod resolver;
pub mod types;

pub use admission::{AdmissionController, AdmissionPermit};
pub use coordinator::UploadCoordinator;
pub use reader::{read_bounded, ChunkSource, MultipartSource, ReaderSource};
pub use resolver::{sanitize, split_ext, NameResolver};
pub use types::*;
