//! Block storage v3 volumes.

use crate::client::ServiceClient;
use crate::compute::Link;
use ostack_session::Session;
use ostack_types::{Interface, traits::Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};

pub const SERVICE_TYPE: &str = "volumev3";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateVolume {
    /// Size in GiB.
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateVolume {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct VolumeClient {
    client: ServiceClient,
}

impl VolumeClient {
    /// `base_url` is the project-scoped endpoint, e.g. `http://host:8776/v3/<project>`.
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

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn volumes(&self) -> Result<Vec<Volume>> {
        self.client.get_keyed(&["volumes"], "volumes", &[]).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn volume(&self, id: &str) -> Result<Volume> {
        self.client.get_keyed(&["volumes", id], "volume", &[]).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn create_volume(&self, params: &CreateVolume) -> Result<Volume> {
        self.client
            .post_keyed(&["volumes"], "volume", params)
            .await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn update_volume(&self, id: &str, params: &UpdateVolume) -> Result<Volume> {
        self.client
            .put_keyed(&["volumes", id], "volume", params)
            .await
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn delete_volume(&self, id: &str) -> Result<()> {
        self.client.delete(&["volumes", id]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session;
    use httpmock::prelude::*;
    use ostack_types::{OsError, StatusKind};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_update() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v3/p1/volumes")
                    .json_body(json!({"volume": {"size": 10, "name": "data"}}));
                then.status(202).json_body(json!({
                    "volume": {
                        "id": "v1",
                        "name": "data",
                        "size": 10,
                        "status": "creating",
                        "links": [{"href": "http://x/v3/p1/volumes/v1", "rel": "self"}]
                    }
                }));
            })
            .await;
        let update = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/v3/p1/volumes/v1")
                    .json_body(json!({"volume": {"description": "scratch"}}));
                then.status(200).json_body(json!({
                    "volume": {"id": "v1", "name": "data", "description": "scratch"}
                }));
            })
            .await;

        let client = VolumeClient::new(session(), &server.url("/v3/p1/"));
        let volume = client
            .create_volume(&CreateVolume {
                size: 10,
                name: Some("data".into()),
                description: None,
            })
            .await
            .unwrap();
        create.assert_async().await;
        assert_eq!(volume.status.as_deref(), Some("creating"));
        assert_eq!(volume.links[0].rel, "self");

        let updated = client
            .update_volume(
                "v1",
                &UpdateVolume {
                    description: Some("scratch".into()),
                    ..UpdateVolume::default()
                },
            )
            .await
            .unwrap();
        update.assert_async().await;
        assert_eq!(updated.description.as_deref(), Some("scratch"));
    }

    #[tokio::test]
    async fn test_missing_volume_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/nope");
                then.status(404)
                    .json_body(json!({"itemNotFound": {"code": 404, "message": "Volume nope could not be found."}}));
            })
            .await;

        let client = VolumeClient::new(session(), &server.base_url());
        let err = client.volume("nope").await.unwrap_err();
        assert_eq!(err.status_kind(), Some(StatusKind::NotFound));
        assert!(matches!(err, OsError::Status { .. }));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes");
                then.status(200)
                    .json_body(json!({"volumes": [{"id": "v1", "name": "a"}, {"id": "v2"}]}));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/volumes/v2");
                then.status(202);
            })
            .await;

        let client = VolumeClient::new(session(), &server.base_url());
        let volumes = client.volumes().await.unwrap();
        assert_eq!(volumes.len(), 2);
        assert!(volumes[1].name.is_none());
        client.delete_volume("v2").await.unwrap();
        delete.assert_async().await;
    }
}
