//! Filedrop Server Library
//!
//! Upload service core plus its HTTP surface. The server binary is in
//! main.rs; integration tests build the router from here.
//!
//! # Modules
//!
//! - `upload`: Admission control, bounded reads, collision-safe commits
//! - `storage`: File store trait and in-memory backend
//! - `metrics`: Counters and gauges with consistent snapshots
//! - `routes`: axum handlers and router assembly

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod storage;
pub mod upload;

pub use config::Config;
pub use state::AppState;
