//! Error types for the upload module.
//!
//! Every failure kind terminates at the owning item's `error` status;
//! none propagates to a global fault. The `Display` output of these
//! errors is exactly the message recorded on the item and shown to the
//! user, which is why `Validation` and `Server` render their message
//! without any prefix.

use thiserror::Error;

use crate::auth::AuthError;

/// Errors that can occur while transferring one item.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Local pre-flight validation failure (size, type, empty payload).
    ///
    /// Detected before any network call. Not recoverable by retry: the
    /// item is malformed by construction and must be re-added.
    #[error("{reason}")]
    Validation {
        /// The user-facing validation message.
        reason: String,
    },

    /// The credential provider could not supply a token.
    ///
    /// Recoverable via retry once credentials are restored.
    #[error("authentication required: {source}")]
    Auth {
        /// The underlying credential failure.
        #[source]
        source: AuthError,
    },

    /// Transport-level failure: no response was received.
    #[error("network error during upload: {source}")]
    Network {
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    ///
    /// `detail` carries the server-supplied message when the error body
    /// was structured, otherwise a status-derived fallback.
    #[error("{detail}")]
    Server {
        /// The HTTP status code.
        status: u16,
        /// The user-facing failure message.
        detail: String,
    },
}

impl UploadError {
    /// Creates a validation error with a user-facing message.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Creates an authentication error from a credential failure.
    #[must_use]
    pub fn auth(source: AuthError) -> Self {
        Self::Auth { source }
    }

    /// Creates a network error from a reqwest error.
    #[must_use]
    pub fn network(source: reqwest::Error) -> Self {
        Self::Network { source }
    }

    /// Creates a server error from a status code and message.
    pub fn server(status: u16, detail: impl Into<String>) -> Self {
        Self::Server {
            status,
            detail: detail.into(),
        }
    }

    /// Returns the taxonomy label for this error, used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Auth { .. } => "auth",
            Self::Network { .. } => "network",
            Self::Server { .. } => "server",
        }
    }
}

// Note on From trait implementations:
// We intentionally do NOT implement `From<reqwest::Error>` because a
// reqwest error alone does not say whether a response was received; the
// client maps transport failures to `network()` and decoded non-2xx
// responses to `server()` at the call site.
