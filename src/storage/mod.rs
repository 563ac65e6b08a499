//! Persistence layer.
//!
//! Every store persists as a full JSON snapshot: the whole collection is
//! rewritten on each update. Callers serialise writers per resource (each
//! store holds its own lock); unserialised concurrent writers lose updates.
//!
//! Loading is tolerant. A missing file is an empty store, and a corrupt one
//! is logged and treated as empty so the caller never fails on it. Stores
//! that must not lose history copy an unreadable file aside with
//! `preserve_unreadable` before their next write replaces it.

pub mod approvals;
pub mod execution_log;
pub mod signal_log;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Write a full snapshot of `value` to `path`, creating parent directories.
pub fn save_snapshot<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialise snapshot for {}", path.display()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;

    debug!(path = %path.display(), bytes = json.len(), "Snapshot saved");
    Ok(())
}

/// Load a snapshot from `path`.
/// Returns None if the file doesn't exist.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot from {}", path.display()))?;

    let value: T = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse snapshot from {}", path.display()))?;

    Ok(Some(value))
}

/// Load a snapshot, falling back to `T::default()` on a missing or corrupt
/// file. Corruption is logged as a warning.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path, resource: &str) -> T {
    match load_snapshot(path) {
        Ok(Some(value)) => {
            info!(resource, path = %path.display(), "Loaded from disk");
            value
        }
        Ok(None) => {
            info!(resource, path = %path.display(), "No saved snapshot, starting empty");
            T::default()
        }
        Err(e) => {
            warn!(
                resource,
                path = %path.display(),
                error = format!("{e:#}"),
                "Snapshot unreadable, starting empty"
            );
            T::default()
        }
    }
}

/// Copy `path` to a timestamped `<name>.corrupt-<ts>` sibling so a later
/// snapshot write cannot destroy it. Returns the copy's path.
pub fn preserve_unreadable(path: &Path) -> Result<PathBuf> {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3f")));
    let target = path.with_file_name(name);

    std::fs::copy(path, &target)
        .with_context(|| format!("Failed to copy {} to {}", path.display(), target.display()))?;
    warn!(path = %path.display(), copy = %target.display(), "Unreadable snapshot preserved");
    Ok(target)
}

/// Delete a snapshot file (for testing or administrative reset).
pub fn delete_snapshot(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to delete snapshot {}", path.display()))?;
    }
    Ok(())
}

/// Lock a store mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
