//! HTTP client for uploading documents.
//!
//! This module provides the `HttpClient` struct which performs a single
//! multipart upload per item, streaming the payload so that progress can
//! be reported as bytes are handed to the transport. The upload request
//! is the orchestrator's only suspension point; there is deliberately no
//! way to abort a request once dispatched.

use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::constants::{CONNECT_TIMEOUT_SECS, PROGRESS_CHUNK_SIZE, READ_TIMEOUT_SECS};
use super::error::UploadError;

/// Metadata fields accompanying one upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Display title sent as the `title` form field.
    pub title: String,
    /// Optional description sent as the `description` form field.
    pub description: Option<String>,
    /// File name attached to the multipart file part.
    pub file_name: String,
    /// Declared content type of the file part.
    pub content_type: String,
}

/// Structured error body returned by the upload service.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// HTTP client for streaming document uploads.
///
/// Designed to be created once and reused for every item in the queue,
/// taking advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Request timeout: 5 minutes (for large files on slow uplinks)
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the
    /// supplied timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, request_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Uploads one document to the given endpoint.
    ///
    /// Issues a single multipart POST carrying the metadata fields and
    /// the streamed payload, authorized with a bearer token. The
    /// `on_progress` callback is invoked with monotonically
    /// non-decreasing percentages as payload chunks are handed to the
    /// transport, culminating at 100 when the last chunk is sent.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Network`] when no response was received,
    /// [`UploadError::Server`] for any non-2xx response (with the
    /// server's `detail` message when the error body is structured), and
    /// [`UploadError::Validation`] when the declared content type cannot
    /// be used in a multipart part.
    #[instrument(
        skip(self, request, payload, token, on_progress),
        fields(file = %request.file_name, bytes = payload.len())
    )]
    pub async fn upload_document(
        &self,
        endpoint: &str,
        request: &UploadRequest,
        payload: Bytes,
        token: &str,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
    ) -> Result<serde_json::Value, UploadError> {
        let total = payload.len();
        let body = progress_body(payload, on_progress);

        let file_part = Part::stream_with_length(body, total as u64)
            .file_name(request.file_name.clone())
            .mime_str(&request.content_type)
            .map_err(|_| {
                UploadError::validation(format!(
                    "Invalid content type: {}",
                    request.content_type
                ))
            })?;

        let mut form = Form::new()
            .text("title", request.title.clone())
            .part("file", file_part);
        if let Some(description) = &request.description {
            form = form.text("description", description.clone());
        }

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::network)?;

        let status = response.status();
        let text = response.text().await.map_err(UploadError::network)?;

        if status.is_success() {
            debug!(%status, "upload accepted");
            Ok(parse_success_body(&text))
        } else {
            Err(UploadError::server(status.as_u16(), error_detail(status, &text)))
        }
    }
}

/// Wraps the payload in a chunked streaming body that reports progress
/// as each chunk is pulled by the transport.
fn progress_body(payload: Bytes, on_progress: impl Fn(u8) + Send + Sync + 'static) -> Body {
    Body::wrap_stream(progress_chunks(payload, on_progress))
}

/// Splits the payload into transport chunks; the progress callback fires
/// lazily as each chunk is pulled off the stream.
fn progress_chunks(
    payload: Bytes,
    on_progress: impl Fn(u8) + Send + Sync + 'static,
) -> impl futures_util::Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = payload.len();
    let mut sent = 0usize;
    let chunks: Vec<Bytes> = (0..total)
        .step_by(PROGRESS_CHUNK_SIZE)
        .map(|offset| payload.slice(offset..(offset + PROGRESS_CHUNK_SIZE).min(total)))
        .collect();

    futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len();
        on_progress(progress_percent(sent, total));
        Ok(chunk)
    }))
}

/// Percentage of `sent` out of `total`, clamped to [0, 100].
#[allow(clippy::cast_possible_truncation)]
fn progress_percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as u64 * 100) / total as u64).min(100) as u8
}

/// Parses a 2xx response body as JSON, falling back to the raw text when
/// the body is not structured data.
fn parse_success_body(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

/// Extracts the failure message from a non-2xx response: the structured
/// `{"detail": ...}` body when present, otherwise a status-derived
/// fallback.
fn error_detail(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.detail)
        .unwrap_or_else(|_| format!("Upload failed with HTTP status {}.", status.as_u16()))
}
