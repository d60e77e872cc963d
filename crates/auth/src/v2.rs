//! Identity v2.0 token provider.
//!
//! Supports password, access-key and token-exchange credentials, each
//! optionally scoped to a tenant. The response carries the token and the
//! service catalog in a single `access` document.

use crate::flow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ostack_config::{AuthSettings, TenantScope};
use ostack_session::Transport;
use ostack_types::{
    AuthMethod, Authenticated, CatalogService, Credential, Endpoint, Envelope, OsError,
    ProjectScope, ServiceCatalog, TokenProvider, traits::Result,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// ── Request ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthRequest<'a> {
    pub auth: AuthBody<'a>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthBody<'a> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_credentials: Option<PasswordCredentials<'a>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_access_key_credentials: Option<AccessKeyCredentials<'a>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenRef<'a>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_name: Option<Cow<'a, str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Cow<'a, str>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordCredentials<'a> {
    pub username: Cow<'a, str>,
    pub password: Cow<'a, str>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyCredentials<'a> {
    pub access_key: Cow<'a, str>,
    pub secret_key: Cow<'a, str>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenRef<'a> {
    pub id: Cow<'a, str>,
}

// ── Response ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AccessResponse {
    pub access: Access,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    pub token: TokenInfo,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub service_catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    pub id: String,
    pub expires: DateTime<Utc>,
    #[serde(default)]
    pub tenant: Option<Tenant>,
}

#[derive(Debug, Deserialize)]
pub struct Tenant {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct Role {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogEndpoint {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, rename = "publicURL")]
    pub public_url: Option<String>,
    #[serde(default, rename = "internalURL")]
    pub internal_url: Option<String>,
    #[serde(default, rename = "adminURL")]
    pub admin_url: Option<String>,
    #[serde(default, rename = "versionId")]
    pub version_id: Option<String>,
}

impl From<CatalogEntry> for CatalogService {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            name: entry.name,
            service_type: entry.service_type,
            endpoints: entry
                .endpoints
                .into_iter()
                .map(|e| Endpoint {
                    region: e.region,
                    public_url: e.public_url,
                    internal_url: e.internal_url,
                    admin_url: e.admin_url,
                    version_id: e.version_id,
                })
                .collect(),
        }
    }
}

/// Builds the `{"auth": {...}}` body for v2 settings.
///
/// # Errors
///
/// Returns [`OsError::Config`] for v3-only settings.
pub fn build_auth_request(settings: &AuthSettings) -> Result<AuthRequest<'_>> {
    let body = match settings {
        AuthSettings::Password {
            username,
            password,
            scope,
        } => {
            let (tenant_name, tenant_id) = match scope {
                TenantScope::Unscoped => (None, None),
                TenantScope::Name(name) => (Some(Cow::from(name.as_str())), None),
                TenantScope::Id(id) => (None, Some(Cow::from(id.as_str()))),
            };
            AuthBody {
                password_credentials: Some(PasswordCredentials {
                    username: Cow::from(username.as_str()),
                    password: Cow::from(password.expose_secret()),
                }),
                tenant_name,
                tenant_id,
                ..AuthBody::default()
            }
        }
        AuthSettings::AccessKey {
            access_key,
            secret_key,
            tenant_id,
        } => AuthBody {
            api_access_key_credentials: Some(AccessKeyCredentials {
                access_key: Cow::from(access_key.as_str()),
                secret_key: Cow::from(secret_key.expose_secret()),
            }),
            tenant_id: tenant_id.as_deref().map(Cow::from),
            ..AuthBody::default()
        },
        AuthSettings::Token { tenant_name, token } => AuthBody {
            token: Some(TokenRef {
                id: Cow::from(token.expose_secret()),
            }),
            tenant_name: Some(Cow::from(tenant_name.as_str())),
            ..AuthBody::default()
        },
        AuthSettings::V3Password { .. } => {
            return Err(OsError::Config(
                "v3 password settings used with identity v2".into(),
            ));
        }
    };
    Ok(AuthRequest { auth: body })
}

/// Decodes an `access` document into a credential and catalog.
///
/// # Errors
///
/// Returns [`OsError::Format`] for a malformed body and
/// [`OsError::ExpiredCredential`] if the token is already expired.
pub fn parse_access(envelope: &Envelope, method: AuthMethod) -> Result<Authenticated> {
    let AccessResponse { access } = envelope.json()?;
    let project = access.token.tenant.map(|t| ProjectScope {
        id: t.id,
        name: t.name,
    });
    let mut credential = Credential::new(access.token.id, access.token.expires, method);
    if let Some(project) = project {
        credential = credential.with_project(project);
    }
    let credential = credential.ensure_live()?;

    if let Some(user) = &access.user {
        tracing::debug!(
            user = user.name.as_deref().or(user.id.as_deref()).unwrap_or_default(),
            roles = user.roles.len(),
            "token issued"
        );
    }

    let catalog = ServiceCatalog::new(
        access
            .service_catalog
            .into_iter()
            .map(CatalogService::from)
            .collect(),
    );
    Ok(Authenticated {
        credential,
        catalog,
    })
}

/// Token provider for identity v2.0 (`POST <auth_url>/tokens`).
#[derive(Debug)]
pub struct IdentityV2 {
    transport: Transport,
    url: String,
    settings: AuthSettings,
}

impl IdentityV2 {
    /// Builds a provider from selected settings.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::Config`] for v3-only settings.
    pub fn new(transport: Transport, auth_url: &str, settings: AuthSettings) -> Result<Self> {
        if matches!(settings, AuthSettings::V3Password { .. }) {
            return Err(OsError::Config(
                "v3 password settings used with identity v2".into(),
            ));
        }
        Ok(Self::build(transport, auth_url, settings))
    }

    fn build(transport: Transport, auth_url: &str, settings: AuthSettings) -> Self {
        Self {
            transport,
            url: format!("{}/tokens", auth_url.trim_end_matches('/')),
            settings,
        }
    }

    /// Unscoped username and password.
    #[must_use]
    pub fn password(transport: Transport, auth_url: &str, username: &str, password: SecretString) -> Self {
        Self::build(
            transport,
            auth_url,
            AuthSettings::Password {
                username: username.to_string(),
                password,
                scope: TenantScope::Unscoped,
            },
        )
    }

    /// Username and password scoped by tenant name.
    #[must_use]
    pub fn password_with_tenant_name(
        transport: Transport,
        auth_url: &str,
        username: &str,
        password: SecretString,
        tenant_name: &str,
    ) -> Self {
        Self::build(
            transport,
            auth_url,
            AuthSettings::Password {
                username: username.to_string(),
                password,
                scope: TenantScope::Name(tenant_name.to_string()),
            },
        )
    }

    /// Username and password scoped by tenant id.
    #[must_use]
    pub fn password_with_tenant_id(
        transport: Transport,
        auth_url: &str,
        username: &str,
        password: SecretString,
        tenant_id: &str,
    ) -> Self {
        Self::build(
            transport,
            auth_url,
            AuthSettings::Password {
                username: username.to_string(),
                password,
                scope: TenantScope::Id(tenant_id.to_string()),
            },
        )
    }

    /// Access key and secret key, optionally scoped by tenant id.
    #[must_use]
    pub fn access_key(
        transport: Transport,
        auth_url: &str,
        access_key: &str,
        secret_key: SecretString,
        tenant_id: Option<&str>,
    ) -> Self {
        Self::build(
            transport,
            auth_url,
            AuthSettings::AccessKey {
                access_key: access_key.to_string(),
                secret_key,
                tenant_id: tenant_id.map(str::to_string),
            },
        )
    }

    /// Exchanges an existing token for one scoped to `tenant_name`.
    #[must_use]
    pub fn token(transport: Transport, auth_url: &str, tenant_name: &str, token: SecretString) -> Self {
        Self::build(
            transport,
            auth_url,
            AuthSettings::Token {
                tenant_name: tenant_name.to_string(),
                token,
            },
        )
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenProvider for IdentityV2 {
    async fn authenticate(&self) -> Result<Authenticated> {
        let body = build_auth_request(&self.settings)?;
        let envelope = flow::exchange(&self.transport, &self.url, &body).await?;
        parse_access(&envelope, self.method())
    }

    fn method(&self) -> AuthMethod {
        match self.settings {
            AuthSettings::AccessKey { .. } => AuthMethod::AccessKey,
            AuthSettings::Token { .. } => AuthMethod::Token,
            AuthSettings::V3Password { .. } => AuthMethod::V3Password,
            AuthSettings::Password { .. } => AuthMethod::Password,
        }
    }
}
