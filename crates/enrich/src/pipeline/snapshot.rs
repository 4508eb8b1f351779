//! Profile snapshot file.
//!
//! The fetcher overwrites the snapshot with the full, deduplicated profile
//! list after every page, so a crash loses at most the page in flight.

use std::path::{Path, PathBuf};

use segment_enrich_core::Profile;
use thiserror::Error;

/// Errors reading or writing the snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem operation failed.
    #[error("Snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot content is not a JSON array of profiles.
    #[error("Invalid snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Overwrite the snapshot at `path` with `profiles`.
///
/// The content is written to a sibling temporary file and renamed into
/// place, so readers never observe a half-written snapshot.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be
/// written.
pub async fn write_snapshot(path: &Path, profiles: &[Profile]) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SnapshotError::io(parent, e))?;
    }

    let json = serde_json::to_vec_pretty(profiles).map_err(|e| SnapshotError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| SnapshotError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| SnapshotError::io(path, e))
}

/// Load a snapshot written by [`write_snapshot`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a profile array.
pub async fn load_snapshot(path: &Path) -> Result<Vec<Profile>, SnapshotError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| SnapshotError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| SnapshotError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}
