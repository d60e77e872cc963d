//! Identity v3 password provider.
//!
//! The token id arrives in the `X-Subject-Token` response header; the body
//! holds expiry, project and a flat per-interface catalog which is folded
//! into the same [`ServiceCatalog`] shape v2 produces.

use crate::flow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ostack_session::Transport;
use ostack_types::{
    AuthMethod, Authenticated, CatalogService, Credential, Endpoint, Envelope, Interface, OsError,
    ProjectScope, ServiceCatalog, TokenProvider, traits::Result,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: TokenBody,
}

#[derive(Debug, Deserialize)]
pub struct TokenBody {
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub project: Option<Project>,
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

impl From<CatalogEntry> for CatalogService {
    fn from(entry: CatalogEntry) -> Self {
        let mut endpoints: Vec<Endpoint> = Vec::new();
        for ep in entry.endpoints {
            let Ok(interface) = ep.interface.parse::<Interface>() else {
                tracing::debug!(interface = %ep.interface, "skipping unknown endpoint interface");
                continue;
            };
            let region = ep.region.or(ep.region_id);
            let idx = match endpoints.iter().position(|e| e.region == region) {
                Some(idx) => idx,
                None => {
                    endpoints.push(Endpoint {
                        region,
                        ..Endpoint::default()
                    });
                    endpoints.len() - 1
                }
            };
            endpoints[idx].set_url(interface, ep.url);
        }
        Self {
            name: entry.name,
            service_type: entry.service_type,
            endpoints,
        }
    }
}

/// Builds the v3 password request body.
#[must_use]
pub fn build_auth_request(user_id: &str, password: &str, project_id: Option<&str>) -> Value {
    let mut body = json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {"user": {"id": user_id, "password": password}}
            }
        }
    });
    if let Some(project_id) = project_id {
        body["auth"]["scope"] = json!({"project": {"id": project_id}});
    }
    body
}

/// Decodes the token response; the id comes from `X-Subject-Token`.
///
/// # Errors
///
/// Returns [`OsError::Format`] if the header is missing or the body is
/// malformed, and [`OsError::ExpiredCredential`] for an expired token.
pub fn parse_token(envelope: &Envelope) -> Result<Authenticated> {
    let id = envelope
        .header(SUBJECT_TOKEN_HEADER)
        .ok_or_else(|| OsError::Format("identity v3 response has no X-Subject-Token".into()))?
        .to_string();
    let TokenResponse { token } = envelope.json()?;

    let mut credential = Credential::new(id, token.expires_at, AuthMethod::V3Password);
    if let Some(project) = token.project {
        credential = credential.with_project(ProjectScope {
            id: project.id,
            name: project.name,
        });
    }
    let credential = credential.ensure_live()?;
    let catalog = ServiceCatalog::new(token.catalog.into_iter().map(CatalogService::from).collect());
    Ok(Authenticated {
        credential,
        catalog,
    })
}

/// Token provider for identity v3 (`POST <auth_url>/auth/tokens`).
#[derive(Debug)]
pub struct IdentityV3 {
    transport: Transport,
    url: String,
    user_id: String,
    password: SecretString,
    project_id: Option<String>,
}

impl IdentityV3 {
    #[must_use]
    pub fn password(
        transport: Transport,
        auth_url: &str,
        user_id: &str,
        password: SecretString,
        project_id: Option<&str>,
    ) -> Self {
        Self {
            transport,
            url: format!("{}/auth/tokens", auth_url.trim_end_matches('/')),
            user_id: user_id.to_string(),
            password,
            project_id: project_id.map(str::to_string),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenProvider for IdentityV3 {
    async fn authenticate(&self) -> Result<Authenticated> {
        let body = build_auth_request(
            &self.user_id,
            self.password.expose_secret(),
            self.project_id.as_deref(),
        );
        let envelope = flow::exchange(&self.transport, &self.url, &body).await?;
        parse_token(&envelope)
    }

    fn method(&self) -> AuthMethod {
        AuthMethod::V3Password
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use httpmock::prelude::*;
    use ostack_session::TransportOptions;

    fn transport() -> Transport {
        Transport::new(&TransportOptions::default()).unwrap()
    }

    fn token_body(expires: DateTime<Utc>) -> Value {
        json!({
            "token": {
                "methods": ["password"],
                "expires_at": expires.to_rfc3339(),
                "project": {"id": "p-1", "name": "demo", "domain": {"id": "default"}},
                "catalog": [{
                    "type": "compute",
                    "name": "nova",
                    "endpoints": [
                        {"interface": "public", "region": "RegionOne", "url": "http://nova.example/v2.1"},
                        {"interface": "internal", "region": "RegionOne", "url": "http://nova.internal/v2.1"},
                        {"interface": "public", "region_id": "RegionTwo", "url": "http://nova2.example/v2.1"}
                    ]
                }]
            }
        })
    }

    #[test]
    fn test_request_body_scope_optional() {
        let unscoped = build_auth_request("uid", "pw", None);
        assert!(unscoped["auth"].get("scope").is_none());
        assert_eq!(unscoped["auth"]["identity"]["methods"][0], "password");
        assert_eq!(unscoped["auth"]["identity"]["password"]["user"]["id"], "uid");

        let scoped = build_auth_request("uid", "pw", Some("p-1"));
        assert_eq!(scoped["auth"]["scope"]["project"]["id"], "p-1");
    }

    #[test]
    fn test_catalog_grouped_by_region() {
        let entry: CatalogEntry =
            serde_json::from_value(token_body(Utc::now())["token"]["catalog"][0].clone()).unwrap();
        let service = CatalogService::from(entry);
        assert_eq!(service.endpoints.len(), 2);
        let catalog = ServiceCatalog::new(vec![service]);
        assert_eq!(
            catalog
                .endpoint("compute", "RegionOne", Interface::Internal)
                .unwrap(),
            "http://nova.internal/v2.1"
        );
        assert_eq!(
            catalog
                .endpoint("compute", "RegionTwo", Interface::Public)
                .unwrap(),
            "http://nova2.example/v2.1"
        );
    }

    #[tokio::test]
    async fn test_authenticate() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/auth/tokens")
                    .json_body(build_auth_request("uid", "pw", Some("p-1")));
                then.status(201)
                    .header("content-type", "application/json")
                    .header("X-Subject-Token", "gAAAAA-v3")
                    .json_body(token_body(Utc::now() + TimeDelta::hours(1)));
            })
            .await;

        let provider = IdentityV3::password(
            transport(),
            &server.url("/v3"),
            "uid",
            SecretString::from("pw".to_string()),
            Some("p-1"),
        );
        let auth = provider.authenticate().await.unwrap();
        mock.assert_async().await;

        assert_eq!(auth.credential.id(), "gAAAAA-v3");
        assert_eq!(auth.credential.method(), AuthMethod::V3Password);
        assert_eq!(
            auth.credential.project().and_then(|p| p.name.as_deref()),
            Some("demo")
        );
        assert!(!auth.catalog.is_empty());
    }

    #[tokio::test]
    async fn test_expired_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/tokens");
                then.status(201)
                    .header("content-type", "application/json")
                    .header("X-Subject-Token", "old")
                    .json_body(token_body(Utc::now() - TimeDelta::seconds(1)));
            })
            .await;

        let provider = IdentityV3::password(
            transport(),
            &server.base_url(),
            "uid",
            SecretString::from("pw".to_string()),
            None,
        );
        assert!(matches!(
            provider.authenticate().await,
            Err(OsError::ExpiredCredential { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_subject_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/auth/tokens");
                then.status(201)
                    .header("content-type", "application/json")
                    .json_body(token_body(Utc::now() + TimeDelta::hours(1)));
            })
            .await;

        let provider = IdentityV3::password(
            transport(),
            &server.base_url(),
            "uid",
            SecretString::from("pw".to_string()),
            None,
        );
        let err = provider.authenticate().await.unwrap_err();
        assert!(matches!(err, OsError::Format(ref m) if m.contains("X-Subject-Token")));
    }
}
