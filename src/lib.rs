//! Uploader Core Library
//!
//! This library provides the core functionality for the uploader tool:
//! a persistent, strictly sequential upload queue that pushes documents
//! to a remote library service one at a time, with per-item status
//! tracking, progress reporting, manual retry, and pause/resume.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - Credential providers supplying bearer tokens
//! - [`queue`] - Upload queue state machine and snapshot persistence
//! - [`upload`] - HTTP transfer client and the drive-loop engine
//!
//! The queue state machine ([`queue::UploadQueue`]) is free of I/O; the
//! engine ([`upload::UploadEngine`]) owns it behind a mutex, drives the
//! head-of-queue item through the transfer client, and snapshots the
//! queue after every command.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod queue;
pub mod upload;

// Re-export commonly used types
pub use auth::{AuthError, StaticTokenProvider, TokenFileProvider, TokenProvider};
pub use queue::{
    NewUpload, QueueSnapshot, SnapshotError, SnapshotStore, UploadId, UploadItem, UploadQueue,
    UploadStatus,
};
pub use upload::{
    EngineOptions, EngineTuning, HttpClient, UploadEngine, UploadError, UploadPolicy,
    UploadRequest, detect_content_type, title_from_filename,
};
