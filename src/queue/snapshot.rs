//! Snapshot persistence for the upload queue.
//!
//! A snapshot is the restorable subset of queue state: items with their
//! transient payloads stripped, and the activity flags forced to idle.
//! [`SnapshotStore`] writes snapshots as JSON under a fixed file name in
//! a state directory, and restores them on the next session. The queue
//! state machine itself never touches the filesystem; the engine invokes
//! the store after every command.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::item::{UploadId, UploadItem};

/// Fixed store key: the snapshot file name inside the state directory.
pub const SNAPSHOT_FILE_NAME: &str = "upload-queue-storage.json";

/// Current on-disk snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;

/// The restorable subset of queue state.
///
/// Produced by [`crate::queue::UploadQueue::snapshot`]; `is_active` and
/// `active_item` are always recorded idle because an in-flight transfer
/// cannot survive a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Items in processing order, payloads stripped.
    pub items: Vec<UploadItem>,
    /// Always false in a persisted snapshot.
    pub is_active: bool,
    /// Always absent in a persisted snapshot.
    pub active_item: Option<UploadId>,
}

/// Versioned wrapper around the persisted snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    version: u32,
    state: QueueSnapshot,
}

/// Errors that can occur while saving or loading snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem error accessing the snapshot file.
    #[error("IO error accessing {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file holds data that cannot be decoded.
    #[error("invalid snapshot data in {path}: {source}")]
    Corrupt {
        /// The offending file path.
        path: PathBuf,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed snapshot store.
///
/// Saves are written to a temporary file and renamed into place so a
/// crash mid-write never leaves a truncated snapshot behind.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store persisting under `state_dir`.
    ///
    /// The directory is created lazily on the first save.
    #[must_use]
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: state_dir.into().join(SNAPSHOT_FILE_NAME),
        }
    }

    /// Returns the snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists a snapshot, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] if the state directory cannot be
    /// created or the file cannot be written.
    #[instrument(skip(self, snapshot), fields(items = snapshot.items.len()))]
    pub async fn save(&self, snapshot: &QueueSnapshot) -> Result<(), SnapshotError> {
        let persisted = PersistedState {
            version: SNAPSHOT_VERSION,
            state: snapshot.clone(),
        };
        // Infallible: QueueSnapshot contains no non-serializable values.
        let json = serde_json::to_vec_pretty(&persisted).map_err(|source| {
            SnapshotError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SnapshotError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|source| SnapshotError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| SnapshotError::Io {
                path: self.path.clone(),
                source,
            })?;

        debug!(path = %self.path.display(), "queue snapshot saved");
        Ok(())
    }

    /// Loads the persisted snapshot, if one exists.
    ///
    /// Returns `Ok(None)` when no snapshot has been saved yet or when
    /// the file carries an unknown format version (stale data from a
    /// different release is discarded with a warning, not an error).
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Io`] on filesystem failures other than
    /// the file being absent, and [`SnapshotError::Corrupt`] when the
    /// file exists but cannot be decoded.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Option<QueueSnapshot>, SnapshotError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let persisted: PersistedState =
            serde_json::from_slice(&raw).map_err(|source| SnapshotError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if persisted.version != SNAPSHOT_VERSION {
            warn!(
                found = persisted.version,
                expected = SNAPSHOT_VERSION,
                "discarding queue snapshot with unknown version"
            );
            return Ok(None);
        }

        Ok(Some(persisted.state))
    }
}
