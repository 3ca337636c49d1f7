//! Upload queue state machine and snapshot persistence.
//!
//! This module provides the in-memory queue tracking upload items
//! through their lifecycle (pending → uploading → success/error).
//!
//! # Overview
//!
//! The queue system consists of:
//! - [`UploadQueue`] - Ordered item list plus the activity flags
//! - [`UploadItem`] - Individual queue entry with payload and metadata
//! - [`UploadStatus`] - Item lifecycle states
//! - [`SnapshotStore`] - JSON snapshot persistence across sessions
//!
//! `UploadQueue` is a pure state machine: every method is synchronous
//! and free of I/O. The engine in [`crate::upload`] owns a queue behind
//! a mutex, so all mutation is serialized; the queue itself never locks.
//!
//! # Ordering
//!
//! Insertion order is processing order. [`UploadQueue::next_pending`]
//! always selects the lowest-index pending item (strict FIFO, no
//! priority reordering), and at most one item is `uploading` at a time.

mod item;
mod snapshot;

pub use item::{NewUpload, UploadId, UploadItem, UploadStatus};
pub use snapshot::{QueueSnapshot, SNAPSHOT_FILE_NAME, SnapshotError, SnapshotStore};

use tracing::debug;

/// The upload queue: ordered items plus orchestrator activity flags.
///
/// `is_active` gates the drive loop; `active_item` identifies the item
/// currently being transferred, if any. Both are forced back to idle
/// when a snapshot is taken, since an in-flight transfer cannot survive
/// a process restart.
#[derive(Debug, Default)]
pub struct UploadQueue {
    items: Vec<UploadItem>,
    is_active: bool,
    active_item: Option<UploadId>,
}

impl UploadQueue {
    /// Creates an empty, inactive queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a queue from a persisted snapshot.
    ///
    /// Items without a payload are dropped (they cannot be transferred
    /// again), any item persisted mid-transfer is reset to pending, and
    /// the activity flags are forced idle regardless of what was stored.
    #[must_use]
    pub fn from_snapshot(snapshot: QueueSnapshot) -> Self {
        let items = snapshot
            .items
            .into_iter()
            .filter(|item| item.payload.is_some())
            .map(|mut item| {
                if item.status == UploadStatus::Uploading {
                    item.status = UploadStatus::Pending;
                    item.progress = 0;
                }
                item
            })
            .collect();
        Self {
            items,
            is_active: false,
            active_item: None,
        }
    }

    /// Takes a restorable snapshot of the queue.
    ///
    /// Payloads are stripped (transient binary content is not persisted)
    /// and the activity flags are recorded as idle.
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        let items = self
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                item.payload = None;
                item
            })
            .collect();
        QueueSnapshot {
            items,
            is_active: false,
            active_item: None,
        }
    }

    // ==================== Commands ====================

    /// Appends one item per input file, in submission order.
    ///
    /// With more than one file, titles are disambiguated with a
    /// positional suffix ("T - Part 1", "T - Part 2", ...). When
    /// `precomputed_error` is supplied (the result of a synchronous
    /// pre-validation done by the caller), items are created directly in
    /// `error` status and never dispatched. Otherwise items start
    /// `pending`, and adding them activates an inactive queue.
    pub fn add_items(
        &mut self,
        files: Vec<NewUpload>,
        base_title: &str,
        description: Option<&str>,
        precomputed_error: Option<&str>,
    ) -> Vec<UploadId> {
        let multiple = files.len() > 1;
        let mut ids = Vec::with_capacity(files.len());
        for (index, file) in files.into_iter().enumerate() {
            let title = if multiple {
                format!("{base_title} - Part {}", index + 1)
            } else {
                base_title.to_string()
            };
            let description = description.map(ToString::to_string);
            let item = match precomputed_error {
                Some(reason) => UploadItem::failed(title, description, file, reason),
                None => UploadItem::pending(title, description, file),
            };
            ids.push(item.id);
            self.items.push(item);
        }

        if precomputed_error.is_none() && !ids.is_empty() && !self.is_active {
            debug!(added = ids.len(), "activating queue after add");
            self.is_active = true;
        }
        ids
    }

    /// Allows the orchestrator to advance the queue.
    ///
    /// Returns true when the queue was newly activated; idempotent when
    /// already active.
    pub fn start(&mut self) -> bool {
        if self.is_active {
            return false;
        }
        self.is_active = true;
        true
    }

    /// Stops the orchestrator from starting the next item.
    ///
    /// Does not cancel a transfer already dispatched; it only prevents
    /// the next dispatch once the in-flight item settles. The
    /// active-item bookkeeping is cleared immediately.
    pub fn pause(&mut self) {
        self.is_active = false;
        self.active_item = None;
    }

    /// Moves an `error` item back to `pending`, clearing its error.
    ///
    /// A no-op on items in any other state (returns false). A successful
    /// retry reactivates an idle queue.
    pub fn retry(&mut self, id: UploadId) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        if item.status != UploadStatus::Error {
            return false;
        }
        item.status = UploadStatus::Pending;
        item.error = None;
        item.progress = 0;
        if !self.is_active {
            debug!(%id, "reactivating queue after retry");
            self.is_active = true;
        }
        true
    }

    /// Removes an item regardless of its status.
    ///
    /// Removing the currently-uploading item is permitted: the in-flight
    /// transfer is not aborted, and its eventual result is discarded
    /// because the id no longer resolves. Returns false when the id is
    /// unknown.
    pub fn remove_item(&mut self, id: UploadId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        if self.active_item == Some(id) {
            self.active_item = None;
        }
        self.items.len() != before
    }

    /// Removes every settled item (`success` and `error`), leaving
    /// `pending` and `uploading` items untouched.
    pub fn clear_completed(&mut self) {
        self.items.retain(|item| !item.status.is_settled());
    }

    /// Empties the queue unconditionally and halts active processing.
    pub fn clear_all(&mut self) {
        self.items.clear();
        self.is_active = false;
        self.active_item = None;
    }

    // ==================== Drive-loop transitions ====================

    /// Selects the next item to process: the lowest-index pending item.
    #[must_use]
    pub fn next_pending(&self) -> Option<UploadId> {
        self.items
            .iter()
            .find(|item| item.status == UploadStatus::Pending)
            .map(|item| item.id)
    }

    /// Marks the queue as drained: inactive, no active item.
    pub fn deactivate(&mut self) {
        self.pause();
    }

    /// Transitions an item into `uploading`.
    ///
    /// Resets progress to 0, clears any stale error/result, and records
    /// the item as the single active transfer. Returns false when the
    /// item no longer exists (removed between selection and dispatch).
    pub fn mark_uploading(&mut self, id: UploadId) -> bool {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        item.status = UploadStatus::Uploading;
        item.progress = 0;
        item.error = None;
        item.result = None;
        self.active_item = Some(id);
        true
    }

    /// Updates transfer progress for an uploading item.
    ///
    /// Progress is clamped to [0, 100] and non-decreasing within an
    /// attempt; stale lower values and updates for items no longer
    /// uploading are ignored.
    pub fn set_progress(&mut self, id: UploadId, percent: u8) {
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return;
        };
        if item.status != UploadStatus::Uploading {
            return;
        }
        let percent = percent.min(100);
        if percent > item.progress {
            item.progress = percent;
        }
    }

    /// Settles an item as `success`, forcing progress to 100 and storing
    /// the server response.
    ///
    /// Returns false (result discarded) when the item was removed while
    /// its transfer was in flight.
    pub fn mark_success(&mut self, id: UploadId, result: serde_json::Value) -> bool {
        if self.active_item == Some(id) {
            self.active_item = None;
        }
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        item.status = UploadStatus::Success;
        item.progress = 100;
        item.result = Some(result);
        item.error = None;
        true
    }

    /// Settles an item as `error` with the failure message, resetting
    /// progress to 0.
    ///
    /// Returns false when the item was removed while in flight.
    pub fn mark_failed(&mut self, id: UploadId, message: &str) -> bool {
        if self.active_item == Some(id) {
            self.active_item = None;
        }
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            return false;
        };
        item.status = UploadStatus::Error;
        item.progress = 0;
        item.error = Some(message.to_string());
        item.result = None;
        true
    }

    // ==================== Accessors ====================

    /// Returns all items in processing order.
    #[must_use]
    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn item(&self, id: UploadId) -> Option<&UploadItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Whether the orchestrator is allowed to advance the queue.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// The id of the item currently being transferred, if any.
    #[must_use]
    pub fn active_item(&self) -> Option<UploadId> {
        self.active_item
    }

    /// Number of items currently in the given status.
    #[must_use]
    pub fn count_by_status(&self, status: UploadStatus) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == status)
            .count()
    }

    /// Total number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
