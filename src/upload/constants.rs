//! Constants for the upload module (timeouts, policy defaults, delays).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files on slow links).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default maximum accepted file size (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Content type accepted by the default upload policy.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Chunk size for the streamed request body; progress is reported once
/// per chunk handed to the transport.
pub const PROGRESS_CHUNK_SIZE: usize = 64 * 1024;

/// Pause between items after a successful transfer.
pub const SUCCESS_DELAY: Duration = Duration::from_millis(250);

/// Pause between items after a failed transfer. Deliberately longer than
/// [`SUCCESS_DELAY`] so repeated immediate failures do not hammer the
/// remote service.
pub const FAILURE_DELAY: Duration = Duration::from_millis(1000);
