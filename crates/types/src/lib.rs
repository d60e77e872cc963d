//! Core types and traits for the ostack workspace.
//!
//! This crate defines the shared abstractions used by every layer of the
//! client, including the error taxonomy, the status classifier, credentials,
//! the service catalog, the response envelope and the token provider trait.

pub mod catalog;
pub mod credential;
pub mod envelope;
pub mod error;
pub mod status;
pub mod traits;

pub use catalog::{CatalogService, Endpoint, Interface, ServiceCatalog};
pub use credential::{AuthMethod, Credential, CredentialState, ProjectScope};
pub use envelope::Envelope;
pub use error::OsError;
pub use status::{Outcome, StatusKind, classify};
pub use traits::{Authenticated, TokenProvider};
