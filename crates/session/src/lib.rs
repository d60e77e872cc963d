//! HTTP transport and authenticated session for OpenStack APIs.

pub mod request;
pub mod session;
pub mod transport;

pub use request::RequestDescriptor;
pub use session::{AUTH_TOKEN_HEADER, Session, SessionState};
pub use transport::{RawResponse, Transport, TransportOptions};
