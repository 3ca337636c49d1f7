//! Credential providers for authenticated uploads.
//!
//! The upload engine fetches a bearer token immediately before each
//! transfer attempt. A provider failure is recorded as a terminal error
//! for that attempt without contacting the network; the item can be
//! retried once credentials are restored.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token is available (unauthenticated session).
    #[error("no access token available")]
    MissingToken,

    /// Reading a token file failed.
    #[error("failed to read token from {path}: {source}")]
    TokenFile {
        /// The token file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Supplies the bearer token attached to each upload request.
///
/// Implementations must be cheap to call repeatedly: the engine asks
/// for a fresh token before every attempt rather than caching one for
/// the queue's lifetime.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token, or fails if the session is unauthenticated.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingToken`] when no credential is available,
    /// or [`AuthError::TokenFile`] when a backing file cannot be read.
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Token provider backed by a fixed in-memory token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Creates a provider that always returns the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(self.token.clone())
    }
}

/// Token provider that reads the token from a file on every call.
///
/// The file content is trimmed; an empty or missing file counts as
/// unauthenticated. Re-reading on every attempt means an operator can
/// rotate the token on disk without restarting the process.
#[derive(Debug, Clone)]
pub struct TokenFileProvider {
    path: PathBuf,
}

impl TokenFileProvider {
    /// Creates a provider reading from the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenProvider for TokenFileProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| AuthError::TokenFile {
                path: self.path.clone(),
                source,
            })?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(token.to_string())
    }
}
