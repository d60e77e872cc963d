//! Credential representation and expiry logic.

use crate::{OsError, traits::Result};
use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication strategy that produced a [`Credential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Identity v2 `passwordCredentials`.
    Password,
    /// Identity v2 `apiAccessKeyCredentials`.
    AccessKey,
    /// Identity v2 token exchange (`tenantName` + `token.id`).
    Token,
    /// Identity v3 `password` method.
    V3Password,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::AccessKey => write!(f, "access_key"),
            Self::Token => write!(f, "token"),
            Self::V3Password => write!(f, "v3_password"),
        }
    }
}

/// Project (tenant) a credential is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ProjectScope {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }
}

/// Describes the usability of a [`Credential`] at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Live,
    Expired,
}

/// An issued token: opaque id, expiry and optional project scope.
///
/// A credential is never mutated after issue; renewal replaces it.
#[derive(Debug)]
pub struct Credential {
    id: SecretString,
    expires_at: DateTime<Utc>,
    project: Option<ProjectScope>,
    method: AuthMethod,
}

impl Credential {
    pub fn new(id: impl Into<String>, expires_at: DateTime<Utc>, method: AuthMethod) -> Self {
        Self {
            id: SecretString::from(id.into()),
            expires_at,
            project: None,
            method,
        }
    }

    /// Attach a project scope. An empty scope is dropped.
    #[must_use]
    pub fn with_project(mut self, project: ProjectScope) -> Self {
        self.project = (!project.is_empty()).then_some(project);
        self
    }

    /// The token id, as sent in `X-Auth-Token`.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.expose_secret()
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[must_use]
    pub fn project(&self) -> Option<&ProjectScope> {
        self.project.as_ref()
    }

    #[must_use]
    pub fn method(&self) -> AuthMethod {
        self.method
    }

    /// State of the credential at `now`.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> CredentialState {
        if now < self.expires_at {
            CredentialState::Live
        } else {
            CredentialState::Expired
        }
    }

    #[must_use]
    pub fn state(&self) -> CredentialState {
        self.state_at(Utc::now())
    }

    /// Returns `true` if the credential expires within `margin` from now.
    #[must_use]
    pub fn expires_within(&self, margin: TimeDelta) -> bool {
        self.state_at(Utc::now() + margin) == CredentialState::Expired
    }

    /// Reject a freshly issued credential whose expiry is not after now.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::ExpiredCredential`] if the credential is already expired.
    pub fn ensure_live(self) -> Result<Self> {
        match self.state() {
            CredentialState::Live => Ok(self),
            CredentialState::Expired => Err(OsError::ExpiredCredential {
                expires_at: self.expires_at,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_future_expiry() {
        let c = Credential::new("tok", Utc::now() + TimeDelta::hours(1), AuthMethod::Password);
        assert_eq!(c.state(), CredentialState::Live);
        assert_eq!(c.id(), "tok");
    }

    #[test]
    fn test_expired_past_expiry() {
        let c = Credential::new("tok", Utc::now() - TimeDelta::seconds(5), AuthMethod::Token);
        assert_eq!(c.state(), CredentialState::Expired);
    }

    #[test]
    fn test_expiry_boundary_is_expired() {
        let at = Utc::now();
        let c = Credential::new("tok", at, AuthMethod::Password);
        assert_eq!(c.state_at(at), CredentialState::Expired);
        assert_eq!(
            c.state_at(at - TimeDelta::milliseconds(1)),
            CredentialState::Live
        );
    }

    #[test]
    fn test_ensure_live_rejects_expired() {
        let at = Utc::now() - TimeDelta::minutes(1);
        let err = Credential::new("tok", at, AuthMethod::AccessKey)
            .ensure_live()
            .unwrap_err();
        match err {
            OsError::ExpiredCredential { expires_at } => assert_eq!(expires_at, at),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_expires_within_margin() {
        let c = Credential::new("tok", Utc::now() + TimeDelta::seconds(30), AuthMethod::Password);
        assert!(c.expires_within(TimeDelta::seconds(60)));
        assert!(!c.expires_within(TimeDelta::zero()));
    }

    #[test]
    fn test_empty_project_dropped() {
        let c = Credential::new("tok", Utc::now(), AuthMethod::Password)
            .with_project(ProjectScope::default());
        assert!(c.project().is_none());
    }

    #[test]
    fn test_debug_redacts_id() {
        let c = Credential::new("super-secret", Utc::now(), AuthMethod::Password);
        assert!(!format!("{c:?}").contains("super-secret"));
    }
}
