//! Thin typed bindings for OpenStack resource APIs.
//!
//! Every client wraps a shared [`ostack_session::Session`] plus the service's
//! base URL, resolved either explicitly or from the session's catalog.

pub mod client;
pub mod compute;
pub mod image;
pub mod network;
pub mod object_storage;
pub mod volume;

pub use client::ServiceClient;
pub use compute::ComputeClient;
pub use image::ImageClient;
pub use network::NetworkClient;
pub use object_storage::ObjectStorageClient;
pub use volume::VolumeClient;

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use chrono::{TimeDelta, Utc};
    use ostack_session::{Session, Transport, TransportOptions};
    use ostack_types::{
        AuthMethod, Authenticated, CatalogService, Credential, Endpoint, ServiceCatalog,
        TokenProvider, traits::Result,
    };
    use std::sync::Arc;

    /// Session without a token provider; requests go out unauthenticated.
    pub fn session() -> Arc<Session> {
        let transport = Transport::new(&TransportOptions::default()).unwrap();
        Arc::new(Session::new(transport, None))
    }

    struct CatalogProvider(ServiceCatalog);

    #[async_trait]
    impl TokenProvider for CatalogProvider {
        async fn authenticate(&self) -> Result<Authenticated> {
            Ok(Authenticated {
                credential: Credential::new(
                    "tok",
                    Utc::now() + TimeDelta::hours(1),
                    AuthMethod::Password,
                ),
                catalog: self.0.clone(),
            })
        }

        fn method(&self) -> AuthMethod {
            AuthMethod::Password
        }
    }

    /// Session whose catalog maps `service_type` in region `r1` to `url`.
    pub fn catalog_session(service_type: &str, url: &str) -> Arc<Session> {
        let catalog = ServiceCatalog::new(vec![CatalogService {
            name: service_type.to_string(),
            service_type: service_type.to_string(),
            endpoints: vec![Endpoint {
                region: Some("r1".into()),
                public_url: Some(url.to_string()),
                ..Endpoint::default()
            }],
        }]);
        let provider: Arc<dyn TokenProvider> = Arc::new(CatalogProvider(catalog));
        let transport = Transport::new(&TransportOptions::default()).unwrap();
        Arc::new(Session::new(transport, Some(provider)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::catalog_session;
    use httpmock::prelude::*;
    use ostack_types::{Interface, OsError};
    use serde_json::json;

    #[tokio::test]
    async fn test_network_from_catalog_appends_version() {
        let client = NetworkClient::from_catalog(
            catalog_session("network", "http://neutron:9696/"),
            "r1",
            Interface::Public,
        )
        .await
        .unwrap();
        assert_eq!(client.base_url(), "http://neutron:9696/v2.0");

        let client = ImageClient::from_catalog(
            catalog_session("image", "http://glance:9292/v1"),
            "r1",
            Interface::Public,
        )
        .await
        .unwrap();
        assert_eq!(client.base_url(), "http://glance:9292/v1");
    }

    #[tokio::test]
    async fn test_from_catalog_missing_service() {
        let err = VolumeClient::from_catalog(
            catalog_session("compute", "http://nova:8774/v2.1"),
            "r1",
            Interface::Public,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OsError::EndpointNotFound { .. }));
    }

    #[tokio::test]
    async fn test_catalog_client_sends_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v2.1/servers")
                    .header("X-Auth-Token", "tok");
                then.status(200).json_body(json!({"servers": []}));
            })
            .await;

        let session = catalog_session("compute", &server.url("/v2.1"));
        let client = ComputeClient::from_catalog(session, "r1", Interface::Public)
            .await
            .unwrap();
        assert!(client.servers().await.unwrap().is_empty());
        mock.assert_async().await;
    }
}
