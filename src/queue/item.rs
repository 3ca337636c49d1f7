//! Upload item types and status definitions.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of an upload item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Waiting to be transferred.
    Pending,
    /// Currently being transferred.
    Uploading,
    /// Transfer completed successfully.
    Success,
    /// Transfer failed; a manual retry is the only path back to pending.
    Error,
}

impl UploadStatus {
    /// Returns the wire string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Returns true for terminal states (`success` or `error`).
    ///
    /// Settled items are the ones removed by "clear completed".
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "uploading" => Ok(Self::Uploading),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            _ => Err(format!("invalid upload status: {s}")),
        }
    }
}

/// Opaque unique identifier for an upload item.
///
/// Assigned at creation time and stable for the item's lifetime.
/// Random UUIDs guarantee removed ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(Uuid);

impl UploadId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input for a single file handed to the queue.
#[derive(Debug, Clone)]
pub struct NewUpload {
    /// Original file name (used as the multipart part file name).
    pub file_name: String,
    /// Declared content type (checked against the policy allowlist).
    pub content_type: String,
    /// Raw file content. Held in memory for the current session only.
    pub payload: Bytes,
}

/// A single item in the upload queue.
///
/// The `payload` field is transient: it exists only in memory for the
/// current session and is never serialized. A restored item without a
/// payload cannot be transferred and is dropped during restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadItem {
    /// Unique identifier.
    pub id: UploadId,
    /// Display title; mutable only before the transfer completes.
    pub title: String,
    /// Optional free-text description sent alongside the file.
    pub description: Option<String>,
    /// Original file name.
    pub file_name: String,
    /// Declared content type.
    pub content_type: String,
    /// Raw file content; not persisted.
    #[serde(skip)]
    pub payload: Option<Bytes>,
    /// Current lifecycle status.
    pub status: UploadStatus,
    /// Percentage in [0, 100]; meaningful while `uploading`, retained
    /// at its last value otherwise.
    pub progress: u8,
    /// Failure message, present only when `status` is `error`.
    pub error: Option<String>,
    /// Opaque server response, present only when `status` is `success`.
    pub result: Option<serde_json::Value>,
}

impl UploadItem {
    /// Creates a pending item ready for transfer.
    #[must_use]
    pub fn pending(title: impl Into<String>, description: Option<String>, file: NewUpload) -> Self {
        Self {
            id: UploadId::new(),
            title: title.into(),
            description,
            file_name: file.file_name,
            content_type: file.content_type,
            payload: Some(file.payload),
            status: UploadStatus::Pending,
            progress: 0,
            error: None,
            result: None,
        }
    }

    /// Creates an item directly in `error` status from a precomputed
    /// validation failure, bypassing `pending`.
    ///
    /// Lets obviously-invalid files surface to consumers without ever
    /// attempting a transfer.
    #[must_use]
    pub fn failed(
        title: impl Into<String>,
        description: Option<String>,
        file: NewUpload,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: UploadStatus::Error,
            error: Some(error.into()),
            ..Self::pending(title, description, file)
        }
    }

    /// Returns the payload size in bytes, or 0 when the payload is absent.
    #[must_use]
    pub fn payload_size(&self) -> u64 {
        self.payload.as_ref().map_or(0, |payload| payload.len() as u64)
    }
}

impl fmt::Display for UploadItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UploadItem {{ id: {}, title: {}, status: {} }}",
            self.id, self.title, self.status
        )
    }
}
