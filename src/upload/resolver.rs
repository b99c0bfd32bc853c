//! Name Resolver
//!
//! Sanitizes client-supplied filenames and commits payloads under a name
//! that no other entry holds.
//!
//! The probe-then-save sequence runs inside one mutual-exclusion section per
//! resolver. The section wraps store lookups and the insert only; payload
//! bytes are already in memory by the time it is entered.

use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::storage::{FileStore, StoredFile};
use super::types::{UploadError, COLLISION_SUFFIX_LEN};

/// Reserved device names on Windows; prefixed so they never name a real device
const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

// ============================================================================
// Sanitization
// ============================================================================

/// Reduce a raw filename to a safe, flat name
///
/// Path separators become word breaks, characters outside `[A-Za-z0-9._-]`
/// are dropped, whitespace runs are joined with `_`, and leading or trailing
/// dots and underscores are stripped. `../../etc/passwd` becomes `etc_passwd`.
pub fn sanitize(raw: &str) -> Result<String, UploadError> {
    let spaced: String = raw
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') || c.is_whitespace())
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let trimmed = joined.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        return Err(UploadError::InvalidName);
    }

    let stem = trimmed.split('.').next().unwrap_or(trimmed);
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
    {
        return Ok(format!("_{}", trimmed));
    }

    Ok(trimmed.to_string())
}

/// Split a name into root and extension; the extension keeps its dot
///
/// Leading dots never start an extension: `.profile` has none.
pub fn split_ext(name: &str) -> (&str, &str) {
    let body_start = name.len() - name.trim_start_matches('.').len();
    match name[body_start..].rfind('.') {
        Some(idx) => name.split_at(body_start + idx),
        None => (name, ""),
    }
}

fn random_suffix() -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(COLLISION_SUFFIX_LEN);
    hex
}

// ============================================================================
// Name Resolver
// ============================================================================

/// Serializes collision resolution and the store write
#[derive(Clone, Default)]
pub struct NameResolver {
    section: Arc<Mutex<()>>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `payload` under `safe_name`, or a suffixed variant if taken
    ///
    /// Retries with a fresh random suffix until a free name is found; there is
    /// no retry cap.
    pub async fn resolve_and_commit(
        &self,
        safe_name: &str,
        content_type: &str,
        payload: Bytes,
        store: &dyn FileStore,
    ) -> Result<StoredFile, UploadError> {
        let _section = self.section.lock().await;

        let mut candidate = safe_name.to_string();
        let mut collisions = 0usize;
        while store.get(&candidate).await?.is_some() {
            collisions += 1;
            let (root, ext) = split_ext(safe_name);
            candidate = format!("{}-{}{}", root, random_suffix(), ext);
        }

        let stored = store.save(&candidate, content_type, payload).await?;

        if collisions > 0 {
            tracing::info!(
                requested = %safe_name,
                resolved = %stored.name,
                collisions = collisions,
                "Resolved filename collision"
            );
        }

        Ok(stored)
    }
}

// ============================================================================
// Tests
// ============================================================================
