//! Configuration loading for the ostack client.
//!
//! Uses figment to layer an optional YAML file and `OS_*` environment
//! variables over defaults, and selects the authentication strategy.

pub mod auth;
pub mod schema;

pub use auth::{AuthSettings, IdentityVersion, TenantScope};
pub use schema::{Config, ENV_PREFIX, TlsConfig};
