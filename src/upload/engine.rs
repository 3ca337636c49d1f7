//! Upload engine: commands plus the sequential drive loop.
//!
//! The engine owns the queue state machine behind a mutex and exposes
//! the command surface consumers use (`add_items`, `remove_item`,
//! `clear_completed`, `clear_all`, `start`, `pause`, `retry`). When the
//! queue is active, a single background drive loop advances it one item
//! at a time.
//!
//! # Concurrency Model
//!
//! - At most one transfer is in flight at any instant; the drive loop is
//!   the only dispatcher and there is never more than one loop running.
//! - The mutex is held only between suspension points: the transfer
//!   await and the inter-item sleep run without the lock, so commands
//!   issued from other tasks are never blocked behind a transfer.
//! - Pausing (or removing the active item) never aborts the in-flight
//!   request; it only gates the next dispatch. A settled result whose
//!   item id no longer resolves is discarded.
//!
//! # Drive Loop
//!
//! On each tick: stop if inactive; select the lowest-index pending item
//! (none → deactivate, queue drained); re-validate it against the local
//! policy; fetch credentials; mark it uploading and hand it to the
//! transfer client; record the settlement; sleep briefly before the next
//! tick, longer after a failure than after a success.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::auth::TokenProvider;
use crate::queue::{NewUpload, QueueSnapshot, SnapshotStore, UploadId, UploadItem, UploadQueue};

use super::client::{HttpClient, UploadRequest};
use super::constants::{FAILURE_DELAY, SUCCESS_DELAY};
use super::error::UploadError;
use super::validation::UploadPolicy;

/// Inter-item scheduling delays.
///
/// Tuning knobs, not correctness requirements; the only constraint is
/// that the failure delay stays longer than the success delay so
/// repeated immediate failures do not hammer the remote service.
#[derive(Debug, Clone)]
pub struct EngineTuning {
    /// Pause before the next tick after a successful transfer.
    pub success_delay: Duration,
    /// Pause before the next tick after a failed transfer.
    pub failure_delay: Duration,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            success_delay: SUCCESS_DELAY,
            failure_delay: FAILURE_DELAY,
        }
    }
}

/// Optional engine configuration.
#[derive(Debug, Default, Clone)]
pub struct EngineOptions {
    /// Pre-flight validation policy.
    pub policy: UploadPolicy,
    /// Inter-item scheduling delays.
    pub tuning: EngineTuning,
    /// Snapshot store; when set, the queue is persisted after every
    /// command and every settlement.
    pub snapshots: Option<SnapshotStore>,
}

/// Queue state plus drive-loop bookkeeping, guarded by one mutex.
///
/// `driving` is true while a drive loop task exists, including while it
/// waits out a pause: a paused-then-restarted queue is picked up by the
/// existing loop once its in-flight item settles, never by a second one.
struct DriveState {
    queue: UploadQueue,
    driving: bool,
}

struct EngineInner {
    state: Mutex<DriveState>,
    client: HttpClient,
    tokens: Arc<dyn TokenProvider>,
    endpoint: String,
    policy: UploadPolicy,
    tuning: EngineTuning,
    snapshots: Option<SnapshotStore>,
}

/// The upload queue orchestrator.
///
/// Cheap to clone; all clones share the same queue. Owned by the
/// application root and handed to consumers explicitly; there is no
/// ambient global instance.
#[derive(Clone)]
pub struct UploadEngine {
    inner: Arc<EngineInner>,
}

impl UploadEngine {
    /// Creates an engine with default policy and tuning and no
    /// persistence.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        client: HttpClient,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self::new_with_options(endpoint, client, tokens, EngineOptions::default())
    }

    /// Creates an engine with explicit options.
    #[must_use]
    pub fn new_with_options(
        endpoint: impl Into<String>,
        client: HttpClient,
        tokens: Arc<dyn TokenProvider>,
        options: EngineOptions,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(DriveState {
                    queue: UploadQueue::new(),
                    driving: false,
                }),
                client,
                tokens,
                endpoint: endpoint.into(),
                policy: options.policy,
                tuning: options.tuning,
                snapshots: options.snapshots,
            }),
        }
    }

    // A poisoned mutex means a panicked tick; propagating the panic is
    // the only sound option.
    #[allow(clippy::expect_used)]
    fn lock_state(&self) -> MutexGuard<'_, DriveState> {
        self.inner.state.lock().expect("queue state mutex poisoned")
    }

    /// Restores the queue from the configured snapshot store.
    ///
    /// Intended to be called once at startup, before items are added;
    /// a non-empty or driving queue is left untouched. Returns the
    /// number of restored items (always 0 when no store is configured
    /// or the snapshot is unusable; restore failures are logged, not
    /// fatal).
    #[instrument(skip(self))]
    pub async fn restore(&self) -> usize {
        let Some(store) = &self.inner.snapshots else {
            return 0;
        };
        let snapshot = match store.load().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return 0,
            Err(err) => {
                warn!(error = %err, "failed to restore queue snapshot");
                return 0;
            }
        };

        let mut state = self.lock_state();
        if !state.queue.is_empty() || state.driving {
            warn!("refusing to restore snapshot over a live queue");
            return 0;
        }
        state.queue = UploadQueue::from_snapshot(snapshot);
        let restored = state.queue.len();
        if restored > 0 {
            info!(restored, "queue restored from snapshot");
        }
        restored
    }

    // ==================== Commands ====================

    /// Appends one item per file, auto-activating the queue for non-error
    /// items. Returns the new item ids in submission order.
    ///
    /// See [`UploadQueue::add_items`] for titling and the precomputed
    /// error path.
    #[instrument(skip_all, fields(count = files.len(), base_title))]
    pub async fn add_items(
        &self,
        files: Vec<NewUpload>,
        base_title: &str,
        description: Option<&str>,
        precomputed_error: Option<&str>,
    ) -> Vec<UploadId> {
        let ids = {
            let mut state = self.lock_state();
            let ids = state
                .queue
                .add_items(files, base_title, description, precomputed_error);
            self.spawn_drive_if_needed(&mut state);
            ids
        };
        self.persist().await;
        ids
    }

    /// Removes an item regardless of status; an in-flight transfer for
    /// the removed item is not aborted, its result is discarded.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, id: UploadId) -> bool {
        let removed = self.lock_state().queue.remove_item(id);
        self.persist().await;
        removed
    }

    /// Removes every settled (`success` or `error`) item.
    #[instrument(skip(self))]
    pub async fn clear_completed(&self) {
        self.lock_state().queue.clear_completed();
        self.persist().await;
    }

    /// Empties the queue and halts active processing.
    #[instrument(skip(self))]
    pub async fn clear_all(&self) {
        self.lock_state().queue.clear_all();
        self.persist().await;
    }

    /// Allows the queue to advance and starts the drive loop. Idempotent
    /// when already active.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        {
            let mut state = self.lock_state();
            state.queue.start();
            self.spawn_drive_if_needed(&mut state);
        }
        self.persist().await;
    }

    /// Stops the queue from starting the next item. Never cancels the
    /// transfer already in flight.
    #[instrument(skip(self))]
    pub async fn pause(&self) {
        self.lock_state().queue.pause();
        self.persist().await;
    }

    /// Moves an `error` item back to `pending` and reactivates an idle
    /// queue. A no-op on items in any other state.
    #[instrument(skip(self))]
    pub async fn retry(&self, id: UploadId) -> bool {
        let retried = {
            let mut state = self.lock_state();
            let retried = state.queue.retry(id);
            self.spawn_drive_if_needed(&mut state);
            retried
        };
        self.persist().await;
        retried
    }

    // ==================== Views ====================

    /// Returns a copy of all items in processing order.
    #[must_use]
    pub fn items(&self) -> Vec<UploadItem> {
        self.lock_state().queue.items().to_vec()
    }

    /// Looks up one item by id.
    #[must_use]
    pub fn item(&self, id: UploadId) -> Option<UploadItem> {
        self.lock_state().queue.item(id).cloned()
    }

    /// Whether the queue is currently allowed to advance.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock_state().queue.is_active()
    }

    /// The item currently being transferred, if any.
    #[must_use]
    pub fn active_item(&self) -> Option<UploadItem> {
        let state = self.lock_state();
        state.queue.active_item().and_then(|id| state.queue.item(id).cloned())
    }

    /// Whether a drive loop currently exists (an item may be in flight
    /// or an inter-item delay may be pending).
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.lock_state().driving
    }

    /// Takes a sanitized snapshot of the current queue state.
    #[must_use]
    pub fn snapshot(&self) -> QueueSnapshot {
        self.lock_state().queue.snapshot()
    }

    // ==================== Drive loop ====================

    /// Starts the background drive loop when the queue is active and no
    /// loop exists yet. Must be called with the state lock held so the
    /// activation check and the `driving` flip are atomic.
    fn spawn_drive_if_needed(&self, state: &mut DriveState) {
        if state.queue.is_active() && !state.driving {
            state.driving = true;
            let engine = self.clone();
            tokio::spawn(async move { engine.run().await });
        }
    }

    async fn run(self) {
        debug!("drive loop started");
        loop {
            let next = {
                let mut state = self.lock_state();
                if !state.queue.is_active() {
                    state.driving = false;
                    break;
                }
                match state.queue.next_pending() {
                    Some(id) => id,
                    None => {
                        // Queue drained: go idle and release loop ownership.
                        state.queue.deactivate();
                        state.driving = false;
                        break;
                    }
                }
            };

            let succeeded = self.process_item(next).await;
            self.persist().await;

            let delay = if succeeded {
                self.inner.tuning.success_delay
            } else {
                self.inner.tuning.failure_delay
            };
            tokio::time::sleep(delay).await;
        }
        debug!("drive loop stopped");
    }

    /// Runs one item through pre-flight validation, credential fetch,
    /// and the transfer client. Returns true when the item settled
    /// successfully (or vanished), false on failure.
    #[instrument(skip(self))]
    async fn process_item(&self, id: UploadId) -> bool {
        let Some((request, payload)) = ({
            let state = self.lock_state();
            state.queue.item(id).map(|item| {
                (
                    UploadRequest {
                        title: item.title.clone(),
                        description: item.description.clone(),
                        file_name: item.file_name.clone(),
                        content_type: item.content_type.clone(),
                    },
                    item.payload.clone(),
                )
            })
        }) else {
            debug!(%id, "item removed before dispatch");
            return true;
        };

        // Defense against stale invalid entries reaching the front of
        // the queue: re-check the policy locally before any network work.
        let size = payload.as_ref().map_or(0, |payload| payload.len() as u64);
        if let Err(err) = self.inner.policy.validate(&request.content_type, size) {
            warn!(%id, kind = err.kind(), error = %err, "pre-flight validation failed");
            self.lock_state().queue.mark_failed(id, &err.to_string());
            return false;
        }

        let token = match self.inner.tokens.access_token().await {
            Ok(token) => token,
            Err(err) => {
                let err = UploadError::auth(err);
                warn!(%id, kind = err.kind(), error = %err, "credential fetch failed");
                self.lock_state().queue.mark_failed(id, &err.to_string());
                return false;
            }
        };

        {
            let mut state = self.lock_state();
            if !state.queue.is_active() {
                // Paused between selection and dispatch; leave pending.
                return true;
            }
            if !state.queue.mark_uploading(id) {
                debug!(%id, "item removed before dispatch");
                return true;
            }
        }

        let progress_engine = self.clone();
        let result = self
            .inner
            .client
            .upload_document(
                &self.inner.endpoint,
                &request,
                payload.unwrap_or_else(Bytes::new),
                &token,
                move |percent| {
                    progress_engine.lock_state().queue.set_progress(id, percent);
                },
            )
            .await;

        let mut state = self.lock_state();
        match result {
            Ok(body) => {
                if state.queue.mark_success(id, body) {
                    info!(%id, title = %request.title, "upload succeeded");
                } else {
                    debug!(%id, "discarding result for removed item");
                }
                true
            }
            Err(err) => {
                if state.queue.mark_failed(id, &err.to_string()) {
                    warn!(%id, kind = err.kind(), error = %err, "upload failed");
                } else {
                    debug!(%id, "discarding failure for removed item");
                }
                false
            }
        }
    }

    /// Persists a sanitized snapshot when a store is configured.
    ///
    /// Persistence failures are logged and swallowed: a broken state
    /// directory must not halt the queue.
    async fn persist(&self) {
        let Some(store) = &self.inner.snapshots else {
            return;
        };
        let snapshot = self.lock_state().queue.snapshot();
        if let Err(err) = store.save(&snapshot).await {
            warn!(error = %err, "failed to persist queue snapshot");
        }
    }
}
