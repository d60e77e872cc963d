//! Object storage v1: account, containers and objects.
//!
//! Metadata travels in headers (`X-Account-Meta-*`, `X-Container-Meta-*`,
//! `X-Object-Meta-*`), so the meta calls return the raw [`HeaderMap`] and the
//! setters take header name and value pairs.

use crate::client::ServiceClient;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use ostack_session::{RequestDescriptor, Session};
use ostack_types::{Envelope, Interface, OsError, traits::Result};
use serde::{Deserialize, de::DeserializeOwned};
use std::sync::Arc;

pub const SERVICE_TYPE: &str = "object-store";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub bytes: u64,
}

/// One listing row. Listings with a delimiter also return `subdir`
/// pseudo-directories, which carry no name or size.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subdir: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// Paging and filtering for object listings.
#[derive(Debug, Clone, Default)]
pub struct ObjectQuery {
    pub limit: Option<u64>,
    pub marker: Option<String>,
    pub prefix: Option<String>,
    pub path: Option<String>,
    pub delimiter: Option<char>,
}

impl ObjectQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("format", "json".to_string())];
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        let optional = [
            ("marker", self.marker.clone()),
            ("prefix", self.prefix.clone()),
            ("path", self.path.clone()),
            ("delimiter", self.delimiter.map(String::from)),
        ];
        pairs.extend(
            optional
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v))),
        );
        pairs
    }
}

/// Headers and content of a downloaded object.
#[derive(Debug, Clone)]
pub struct Object {
    pub headers: HeaderMap,
    pub content: Bytes,
}

#[derive(Debug, Clone)]
pub struct ObjectStorageClient {
    client: ServiceClient,
}

impl ObjectStorageClient {
    /// `base_url` is the account URL, e.g. `http://host:8080/v1/AUTH_<project>`.
    #[must_use]
    pub fn new(session: Arc<Session>, base_url: &str) -> Self {
        Self {
            client: ServiceClient::new(session, base_url),
        }
    }

    /// # Errors
    ///
    /// See [`ServiceClient::from_catalog`].
    pub async fn from_catalog(
        session: Arc<Session>,
        region: &str,
        interface: Interface,
    ) -> Result<Self> {
        let client =
            ServiceClient::from_catalog(session, SERVICE_TYPE, region, interface, None).await?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    async fn send(&self, req: RequestDescriptor) -> Result<Envelope> {
        self.client.session().request(req).await
    }

    /// Account totals such as `X-Account-Container-Count` plus any metadata.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn account_meta(&self) -> Result<HeaderMap> {
        let envelope = self.send(RequestDescriptor::head(self.client.url(&[]))).await?;
        Ok(envelope.headers().clone())
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn list_containers(
        &self,
        limit: Option<u64>,
        marker: Option<&str>,
    ) -> Result<Vec<ContainerInfo>> {
        let query = ObjectQuery {
            limit,
            marker: marker.map(str::to_string),
            ..ObjectQuery::default()
        };
        let req = RequestDescriptor::get(self.client.url(&[])).query(query.to_pairs());
        decode_listing(&self.send(req).await?)
    }

    /// Creates a container, or updates it if it exists. `headers` may carry
    /// metadata or settings such as `X-Container-Read`.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::InvalidRequest`] for a bad header, or the dispatch error.
    pub async fn create_container(&self, container: &str, headers: &[(&str, &str)]) -> Result<()> {
        let req = with_headers(RequestDescriptor::put(self.client.url(&[container])), headers)?
            .body(Bytes::new());
        self.send(req).await?;
        tracing::debug!(container = container, "container created");
        Ok(())
    }

    /// Deletes an empty container. A non-empty one is rejected with 409.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn delete_container(&self, container: &str) -> Result<()> {
        self.client.delete(&[container]).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn container_meta(&self, container: &str) -> Result<HeaderMap> {
        let envelope = self
            .send(RequestDescriptor::head(self.client.url(&[container])))
            .await?;
        Ok(envelope.headers().clone())
    }

    /// # Errors
    ///
    /// Returns [`OsError::InvalidRequest`] for a bad header, or the dispatch error.
    pub async fn set_container_meta(&self, container: &str, meta: &[(&str, &str)]) -> Result<()> {
        let req = with_headers(RequestDescriptor::post(self.client.url(&[container])), meta)?;
        self.send(req).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn list_objects(&self, container: &str, query: &ObjectQuery) -> Result<Vec<ObjectInfo>> {
        let req = RequestDescriptor::get(self.client.url(&[container])).query(query.to_pairs());
        decode_listing(&self.send(req).await?)
    }

    /// Uploads `content`. Without a `Content-Type` in `headers` the object is
    /// stored as `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::InvalidRequest`] for a bad header, or the dispatch error.
    pub async fn put_object(
        &self,
        container: &str,
        object: &str,
        content: impl Into<Bytes>,
        headers: &[(&str, &str)],
    ) -> Result<()> {
        let mut req = RequestDescriptor::put(self.client.url(&[container, object]))
            .header("Content-Type", DEFAULT_CONTENT_TYPE)?;
        req = with_headers(req, headers)?.body(content);
        self.send(req).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn get_object(&self, container: &str, object: &str) -> Result<Object> {
        let envelope = self
            .send(RequestDescriptor::get(self.client.url(&[container, object])))
            .await?;
        Ok(Object {
            headers: envelope.headers().clone(),
            content: envelope.into_body(),
        })
    }

    /// Server-side copy. `destination` is `container/object` within the
    /// same account.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::InvalidRequest`] for a bad destination, or the dispatch error.
    pub async fn copy_object(&self, container: &str, object: &str, destination: &str) -> Result<()> {
        let method = Method::from_bytes(b"COPY")
            .map_err(|e| OsError::InvalidRequest(format!("COPY method: {e}")))?;
        let destination = format!("/{}", destination.trim_start_matches('/'));
        let req = RequestDescriptor::new(method, self.client.url(&[container, object]))
            .header("Destination", &destination)?;
        self.send(req).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn delete_object(&self, container: &str, object: &str) -> Result<()> {
        self.client.delete(&[container, object]).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn object_meta(&self, container: &str, object: &str) -> Result<HeaderMap> {
        let envelope = self
            .send(RequestDescriptor::head(self.client.url(&[container, object])))
            .await?;
        Ok(envelope.headers().clone())
    }

    /// Replaces the object's metadata with `meta`.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::InvalidRequest`] for a bad header, or the dispatch error.
    pub async fn set_object_meta(
        &self,
        container: &str,
        object: &str,
        meta: &[(&str, &str)],
    ) -> Result<()> {
        let req = with_headers(
            RequestDescriptor::post(self.client.url(&[container, object])),
            meta,
        )?;
        self.send(req).await?;
        Ok(())
    }
}

/// An empty account or container answers 204 with no body.
fn decode_listing<T: DeserializeOwned>(envelope: &Envelope) -> Result<Vec<T>> {
    if envelope.status() == StatusCode::NO_CONTENT || envelope.body().is_empty() {
        return Ok(Vec::new());
    }
    envelope.json()
}

fn with_headers(mut req: RequestDescriptor, headers: &[(&str, &str)]) -> Result<RequestDescriptor> {
    for (name, value) in headers {
        req = req.header(name, value)?;
    }
    Ok(req)
}
