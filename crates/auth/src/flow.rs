//! The single POST shared by every identity strategy.

use ostack_session::{RequestDescriptor, Transport};
use ostack_types::{Envelope, OsError, Outcome, traits::Result};
use serde::Serialize;

/// Posts `body` to the identity endpoint and returns the JSON response.
///
/// Never retries. The request and response bodies are marked sensitive so
/// debug dumps do not leak passwords or token ids.
///
/// # Errors
///
/// - [`OsError::Transport`] on network failure
/// - [`OsError::AuthRejected`] on a non-success status, with the body attached
/// - [`OsError::Format`] if the response `Content-Type` is not JSON
pub async fn exchange<B: Serialize + ?Sized>(
    transport: &Transport,
    url: &str,
    body: &B,
) -> Result<Envelope> {
    let req = RequestDescriptor::post(url)
        .header("Accept", "application/json")?
        .header("Content-Type", "application/json")?
        .json(body)?
        .sensitive();

    tracing::debug!(url = url, "requesting token");
    let envelope = transport.send(req).await?;

    if let Outcome::Failure(kind) = envelope.outcome() {
        tracing::warn!(url = url, status = %kind, "identity service rejected credentials");
        return Err(OsError::AuthRejected {
            url: url.to_string(),
            kind,
            body: envelope.into_body(),
        });
    }
    if !envelope.is_json() {
        return Err(OsError::Format(format!(
            "identity response from {url} is not JSON (Content-Type: {})",
            envelope.header("content-type").unwrap_or("<none>")
        )));
    }
    Ok(envelope)
}
