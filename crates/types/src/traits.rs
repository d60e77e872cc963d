//! Async traits shared across all ostack crates.
//!
//! Cross-crate abstractions live here so that the session layer depends only
//! on `ostack-types`, not on any concrete authentication strategy.

use crate::{AuthMethod, Credential, OsError, ServiceCatalog};
use async_trait::async_trait;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, OsError>;

/// What a successful authentication yields.
#[derive(Debug)]
pub struct Authenticated {
    pub credential: Credential,
    pub catalog: ServiceCatalog,
}

/// Obtains credentials from an identity service.
///
/// Implementations send exactly one request per call and never retry; the
/// caller decides what to do on failure.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Authenticate and return a live credential with its service catalog.
    async fn authenticate(&self) -> Result<Authenticated>;

    /// Strategy tag for the credentials this provider issues.
    fn method(&self) -> AuthMethod;
}
