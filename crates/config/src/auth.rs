//! Selection of the authentication strategy from a [`Config`].

use crate::Config;
use ostack_types::{OsError, traits::Result};
use secrecy::{ExposeSecret, SecretString};

/// Identity API major version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityVersion {
    #[default]
    V2,
    V3,
}

/// Project scope requested at authentication time (v2 `tenantName`/`tenantId`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    Unscoped,
    Name(String),
    Id(String),
}

/// Credential inputs for one authentication strategy.
#[derive(Debug)]
pub enum AuthSettings {
    /// v2 `passwordCredentials`, optionally scoped.
    Password {
        username: String,
        password: SecretString,
        scope: TenantScope,
    },
    /// v2 `apiAccessKeyCredentials`, optionally scoped by tenant id.
    AccessKey {
        access_key: String,
        secret_key: SecretString,
        tenant_id: Option<String>,
    },
    /// v2 token exchange into `tenant_name`.
    Token {
        tenant_name: String,
        token: SecretString,
    },
    /// v3 `password` method by user id, optionally scoped by project id.
    V3Password {
        user_id: String,
        password: SecretString,
        project_id: Option<String>,
    },
}

impl Config {
    /// Identity API version from `identity_api_version`.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::Config`] for anything other than 2 or 3.
    pub fn identity_version(&self) -> Result<IdentityVersion> {
        match self.identity_api_version.as_deref().map(str::trim) {
            None | Some("2" | "2.0") => Ok(IdentityVersion::V2),
            Some("3" | "3.0") => Ok(IdentityVersion::V3),
            Some(other) => Err(OsError::Config(format!(
                "unsupported identity API version: {other}"
            ))),
        }
    }

    /// Identity endpoint with any trailing slash removed.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::Config`] if `auth_url` is unset or empty.
    pub fn identity_url(&self) -> Result<&str> {
        self.auth_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| OsError::Config("no authentication URL specified".into()))
    }

    /// Pick the authentication strategy the configured fields describe.
    ///
    /// For v2 the order is token exchange, access key, then password. A
    /// tenant id takes precedence over a tenant name when both are set.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::Config`] if no complete set of credentials is present.
    pub fn auth_settings(&self) -> Result<AuthSettings> {
        let tenant_id = self.project_id.clone().or_else(|| self.tenant_id.clone());
        let tenant_name = self
            .project_name
            .clone()
            .or_else(|| self.tenant_name.clone());

        if self.identity_version()? == IdentityVersion::V3 {
            let user_id = self
                .user_id
                .clone()
                .ok_or_else(|| OsError::Config("no user id specified".into()))?;
            let password = self
                .password
                .as_ref()
                .map(copy_secret)
                .ok_or_else(|| OsError::Config("no password specified".into()))?;
            return Ok(AuthSettings::V3Password {
                user_id,
                password,
                project_id: tenant_id,
            });
        }

        if let Some(token) = &self.token {
            let tenant_name = tenant_name.ok_or_else(|| {
                OsError::Config("token exchange requires a tenant name".into())
            })?;
            return Ok(AuthSettings::Token {
                tenant_name,
                token: copy_secret(token),
            });
        }

        if let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key) {
            return Ok(AuthSettings::AccessKey {
                access_key: access_key.clone(),
                secret_key: copy_secret(secret_key),
                tenant_id,
            });
        }

        let username = self
            .username
            .clone()
            .ok_or_else(|| OsError::Config("no username specified".into()))?;
        let password = self
            .password
            .as_ref()
            .map(copy_secret)
            .ok_or_else(|| OsError::Config("no password specified".into()))?;
        let scope = match (tenant_id, tenant_name) {
            (Some(id), _) => TenantScope::Id(id),
            (None, Some(name)) => TenantScope::Name(name),
            (None, None) => TenantScope::Unscoped,
        };
        Ok(AuthSettings::Password {
            username,
            password,
            scope,
        })
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_owned())
}
