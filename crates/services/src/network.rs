//! Network v2.0 networks, subnets and ports.

use crate::client::ServiceClient;
use ostack_session::Session;
use ostack_types::{Interface, traits::Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const SERVICE_TYPE: &str = "network";
const API_VERSION: &str = "v2.0";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default, rename = "router:external")]
    pub router_external: bool,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub port_security_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateNetwork {
    pub name: String,
    pub admin_state_up: bool,
    pub shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPool {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRoute {
    pub destination: String,
    pub nexthop: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Subnet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub network_id: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub enable_dhcp: bool,
    #[serde(default)]
    pub dns_nameservers: Vec<String>,
    #[serde(default)]
    pub allocation_pools: Vec<AllocationPool>,
    #[serde(default)]
    pub host_routes: Vec<HostRoute>,
    #[serde(default)]
    pub ip_version: u8,
    #[serde(default)]
    pub gateway_ip: Option<String>,
    #[serde(default)]
    pub cidr: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSubnet {
    pub network_id: String,
    /// 4 or 6.
    pub ip_version: u8,
    pub cidr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allocation_pools: Vec<AllocationPool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedIp {
    pub subnet_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub admin_state_up: bool,
    #[serde(default)]
    pub port_security_enabled: Option<bool>,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub device_owner: String,
    pub network_id: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
    #[serde(default)]
    pub security_groups: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreatePort {
    pub network_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_state_up: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fixed_ips: Vec<FixedIp>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NetworkClient {
    client: ServiceClient,
}

impl NetworkClient {
    /// `base_url` must include the API version, e.g. `http://host:9696/v2.0`.
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
        let client = ServiceClient::from_catalog(
            session,
            SERVICE_TYPE,
            region,
            interface,
            Some(API_VERSION),
        )
        .await?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }

    /// Lists networks; `query` passes filters such as `name` through.
    ///
    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn networks(&self, query: &[(&str, &str)]) -> Result<Vec<Network>> {
        self.client.get_keyed(&["networks"], "networks", query).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn network(&self, id: &str) -> Result<Network> {
        self.client
            .get_keyed(&["networks", id], "network", &[])
            .await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn create_network(&self, params: &CreateNetwork) -> Result<Network> {
        self.client
            .post_keyed(&["networks"], "network", params)
            .await
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn delete_network(&self, id: &str) -> Result<()> {
        self.client.delete(&["networks", id]).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn subnets(&self, query: &[(&str, &str)]) -> Result<Vec<Subnet>> {
        self.client.get_keyed(&["subnets"], "subnets", query).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn subnet(&self, id: &str) -> Result<Subnet> {
        self.client.get_keyed(&["subnets", id], "subnet", &[]).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn create_subnet(&self, params: &CreateSubnet) -> Result<Subnet> {
        self.client
            .post_keyed(&["subnets"], "subnet", params)
            .await
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn delete_subnet(&self, id: &str) -> Result<()> {
        self.client.delete(&["subnets", id]).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn ports(&self, query: &[(&str, &str)]) -> Result<Vec<Port>> {
        self.client.get_keyed(&["ports"], "ports", query).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn port(&self, id: &str) -> Result<Port> {
        self.client.get_keyed(&["ports", id], "port", &[]).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn create_port(&self, params: &CreatePort) -> Result<Port> {
        self.client.post_keyed(&["ports"], "port", params).await
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn delete_port(&self, id: &str) -> Result<()> {
        self.client.delete(&["ports", id]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_network_lifecycle() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/v2.0/networks").json_body(json!({
                    "network": {"name": "net1", "admin_state_up": true, "shared": false}
                }));
                then.status(201).json_body(json!({
                    "network": {
                        "id": "n1",
                        "name": "net1",
                        "status": "ACTIVE",
                        "admin_state_up": true,
                        "router:external": false,
                        "subnets": []
                    }
                }));
            })
            .await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v2.0/networks")
                    .query_param("name", "net1");
                then.status(200).json_body(json!({
                    "networks": [{"id": "n1", "name": "net1", "status": "ACTIVE", "shared": true}]
                }));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v2.0/networks/n1");
                then.status(204);
            })
            .await;

        let client = NetworkClient::new(session(), &server.url("/v2.0"));
        let created = client
            .create_network(&CreateNetwork {
                name: "net1".into(),
                admin_state_up: true,
                ..CreateNetwork::default()
            })
            .await
            .unwrap();
        create.assert_async().await;
        assert_eq!(created.id, "n1");
        assert!(created.admin_state_up);

        let found = client.networks(&[("name", "net1")]).await.unwrap();
        list.assert_async().await;
        assert!(found[0].shared);

        client.delete_network("n1").await.unwrap();
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_subnet() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/subnets").json_body(json!({
                    "subnet": {
                        "network_id": "n1",
                        "ip_version": 4,
                        "cidr": "10.0.0.0/24",
                        "allocation_pools": [{"start": "10.0.0.10", "end": "10.0.0.20"}]
                    }
                }));
                then.status(201).json_body(json!({
                    "subnet": {
                        "id": "sn1",
                        "network_id": "n1",
                        "ip_version": 4,
                        "cidr": "10.0.0.0/24",
                        "gateway_ip": "10.0.0.1",
                        "enable_dhcp": true,
                        "allocation_pools": [{"start": "10.0.0.10", "end": "10.0.0.20"}]
                    }
                }));
            })
            .await;

        let client = NetworkClient::new(session(), &server.base_url());
        let subnet = client
            .create_subnet(&CreateSubnet {
                network_id: "n1".into(),
                ip_version: 4,
                cidr: "10.0.0.0/24".into(),
                name: None,
                allocation_pools: vec![AllocationPool {
                    start: "10.0.0.10".into(),
                    end: "10.0.0.20".into(),
                }],
            })
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(subnet.gateway_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(subnet.allocation_pools.len(), 1);
    }

    #[tokio::test]
    async fn test_ports() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ports/p1");
                then.status(200).json_body(json!({
                    "port": {
                        "id": "p1",
                        "network_id": "n1",
                        "mac_address": "fa:16:3e:00:00:01",
                        "fixed_ips": [{"subnet_id": "sn1", "ip_address": "10.0.0.5"}],
                        "security_groups": ["default"]
                    }
                }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/ports")
                    .json_body(json!({"port": {"network_id": "n1", "name": "p"}}));
                then.status(201).json_body(json!({"port": {"id": "p2", "network_id": "n1"}}));
            })
            .await;

        let client = NetworkClient::new(session(), &server.base_url());
        let port = client.port("p1").await.unwrap();
        assert_eq!(port.fixed_ips[0].ip_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(port.security_groups, vec!["default".to_string()]);

        let created = client
            .create_port(&CreatePort {
                network_id: "n1".into(),
                name: Some("p".into()),
                ..CreatePort::default()
            })
            .await
            .unwrap();
        create.assert_async().await;
        assert_eq!(created.id, "p2");
    }
}
