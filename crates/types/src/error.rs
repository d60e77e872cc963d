//! Unified error type for the ostack workspace.

use crate::{Envelope, status::StatusKind};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Enumerates all error kinds that can occur across ostack crates.
#[derive(Debug, Error)]
pub enum OsError {
    /// Network-level failure (DNS, connection refused, TLS, timeout).
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// A payload was not JSON or did not match the expected shape.
    #[error("format error: {0}")]
    Format(String),

    /// The identity service rejected the credentials.
    #[error("authentication rejected by {url}: {kind}")]
    AuthRejected {
        url: String,
        kind: StatusKind,
        body: Bytes,
    },

    /// The identity service issued a token that is already expired.
    #[error("credential expired at {expires_at}")]
    ExpiredCredential { expires_at: DateTime<Utc> },

    /// A service returned a non-success status. The full response is kept
    /// so callers can read provider-specific error details.
    #[error("{method} {url}: {kind}")]
    Status {
        method: String,
        url: String,
        kind: StatusKind,
        envelope: Box<Envelope>,
    },

    /// The service catalog has no endpoint for the requested service.
    #[error("endpoint not found: type={service_type}, region={region}")]
    EndpointNotFound {
        service_type: String,
        region: String,
    },

    /// A request could not be built (bad URL, header name or value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for OsError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e.to_string())
    }
}

impl OsError {
    /// The classified status kind, for `Status` and `AuthRejected` errors.
    #[must_use]
    pub fn status_kind(&self) -> Option<StatusKind> {
        match self {
            Self::Status { kind, .. } | Self::AuthRejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Raw response body attached to the error, when there is one.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Status { envelope, .. } => Some(envelope.body()),
            Self::AuthRejected { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `true` for failures of the authentication step itself.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::AuthRejected { .. } | Self::ExpiredCredential { .. }
        )
    }

    /// Returns `true` if the error is likely transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { kind, .. } => matches!(
                kind,
                StatusKind::TooManyRequests
                    | StatusKind::ServerFault
                    | StatusKind::ServiceUnavailable
                    | StatusKind::UnexpectedStatus(408 | 502 | 504)
            ),
            Self::Transport { .. } => true,
            _ => false,
        }
    }
}
