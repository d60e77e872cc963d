//! Fully-read HTTP response.

use crate::{
    OsError,
    status::{Outcome, classify},
    traits::Result,
};
use bytes::Bytes;
use http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// Status, headers and the complete body of one dispatched request.
///
/// The body has already been drained from the connection, so an `Envelope`
/// can be held across decoding without pinning a pooled connection.
#[derive(Debug, Clone)]
pub struct Envelope {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Envelope {
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Classification of this response's status code.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        classify(self.status.as_u16())
    }

    /// Returns `true` if the `Content-Type` header mentions JSON.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::Format`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| OsError::Format(format!("invalid JSON response body: {e}")))
    }
}
