//! Pre-flight validation policy for upload payloads.
//!
//! Validation runs twice: once by callers deciding whether to enqueue
//! an item as a precomputed error, and again by the drive loop right
//! before dispatch (defense against stale invalid entries reaching the
//! front of the queue). Both paths go through [`UploadPolicy::validate`].

use std::path::Path;

use super::constants::{DEFAULT_MAX_FILE_SIZE, PDF_CONTENT_TYPE};
use super::error::UploadError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Size and content-type policy applied before any network call.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Maximum accepted payload size in bytes.
    pub max_file_size: u64,
    /// Accepted content types (compared case-insensitively).
    pub allowed_types: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: vec![PDF_CONTENT_TYPE.to_string()],
        }
    }
}

impl UploadPolicy {
    /// Checks a payload's declared content type and size against the
    /// policy.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Validation`] with a user-facing message
    /// when the content type is not allowlisted, the payload is empty,
    /// or the payload exceeds the size limit.
    #[allow(clippy::cast_precision_loss)]
    pub fn validate(&self, content_type: &str, size: u64) -> Result<(), UploadError> {
        if !self
            .allowed_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
        {
            return Err(UploadError::validation(format!(
                "Only {} files are allowed.",
                allowed_label(&self.allowed_types)
            )));
        }

        if size == 0 {
            return Err(UploadError::validation("File is empty."));
        }

        if size > self.max_file_size {
            return Err(UploadError::validation(format!(
                "File size ({:.2} MB) exceeds the maximum allowed size of {} MB.",
                size as f64 / BYTES_PER_MB,
                self.max_file_size / (1024 * 1024),
            )));
        }

        Ok(())
    }
}

/// Human-readable label for the allowlist, e.g. `PDF` for
/// `application/pdf` or `PDF/PNG` for a two-entry list.
fn allowed_label(allowed_types: &[String]) -> String {
    let labels: Vec<String> = allowed_types
        .iter()
        .map(|content_type| {
            content_type
                .rsplit('/')
                .next()
                .unwrap_or(content_type)
                .to_ascii_uppercase()
        })
        .collect();
    labels.join("/")
}

/// Returns the content type declared for a file path, by extension.
///
/// Only PDF is recognized; everything else is reported as a generic
/// binary type and rejected by the default policy's allowlist.
#[must_use]
pub fn detect_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_CONTENT_TYPE,
        _ => "application/octet-stream",
    }
}
