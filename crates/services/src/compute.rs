//! Compute v2 servers and keypairs.

use crate::client::ServiceClient;
use chrono::{DateTime, Utc};
use ostack_session::{RequestDescriptor, Session};
use ostack_types::{Interface, traits::Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{collections::HashMap, sync::Arc};

pub const SERVICE_TYPE: &str = "compute";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub rel: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceRef {
    pub id: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    pub addr: String,
    #[serde(default)]
    pub version: u8,
    #[serde(default, rename = "OS-EXT-IPS:type")]
    pub ip_type: Option<String>,
    #[serde(default, rename = "OS-EXT-IPS-MAC:mac_addr")]
    pub mac_addr: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, rename = "hostId")]
    pub host_id: Option<String>,
    #[serde(default)]
    pub addresses: HashMap<String, Vec<Address>>,
    #[serde(default)]
    pub links: Vec<Link>,
    /// An object with `id`, or an empty string for volume-backed servers.
    #[serde(default)]
    pub image: Value,
    #[serde(default)]
    pub flavor: Option<ResourceRef>,
    #[serde(default, rename = "OS-EXT-STS:task_state")]
    pub task_state: Option<String>,
    #[serde(default, rename = "OS-EXT-STS:vm_state")]
    pub vm_state: Option<String>,
    #[serde(default, rename = "OS-EXT-STS:power_state")]
    pub power_state: Option<i64>,
    #[serde(default, rename = "OS-EXT-AZ:availability_zone")]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default, rename = "accessIPv4")]
    pub access_ipv4: Option<String>,
    #[serde(default, rename = "accessIPv6")]
    pub access_ipv6: Option<String>,
    #[serde(default)]
    pub config_drive: Option<String>,
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Only present in the create response.
    #[serde(default, rename = "adminPass")]
    pub admin_pass: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerNetwork {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecurityGroupRef {
    pub name: String,
}

/// Body of `POST /servers`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateServer {
    pub name: String,
    #[serde(rename = "imageRef")]
    pub image_ref: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
    /// Base64-encoded user data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<ServerNetwork>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<SecurityGroupRef>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyPair {
    pub name: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Returned once when the server generates the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
}

#[derive(Deserialize)]
struct KeyPairItem {
    keypair: KeyPair,
}

#[derive(Debug, Clone)]
pub struct ComputeClient {
    client: ServiceClient,
}

impl ComputeClient {
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
    pub async fn servers(&self) -> Result<Vec<ServerSummary>> {
        self.client.get_keyed(&["servers"], "servers", &[]).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn servers_detail(&self) -> Result<Vec<Server>> {
        self.client
            .get_keyed(&["servers", "detail"], "servers", &[])
            .await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn server(&self, id: &str) -> Result<Server> {
        self.client.get_keyed(&["servers", id], "server", &[]).await
    }

    /// Boots a server. The response holds only the id, links and admin password.
    ///
    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn create_server(&self, params: &CreateServer) -> Result<Server> {
        let server: Server = self
            .client
            .post_keyed(&["servers"], "server", params)
            .await?;
        tracing::info!(id = %server.id, name = %params.name, "server created");
        Ok(server)
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn delete_server(&self, id: &str) -> Result<()> {
        self.client.delete(&["servers", id]).await?;
        Ok(())
    }

    /// Posts `{action: args}` to the server's action endpoint.
    ///
    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn server_action(&self, id: &str, action: &str, args: Value) -> Result<()> {
        let mut body = serde_json::Map::new();
        body.insert(action.to_string(), args);
        let req = RequestDescriptor::post(self.client.url(&["servers", id, "action"])).json(&body)?;
        self.client.session().request(req).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn reboot_server(&self, id: &str, hard: bool) -> Result<()> {
        let kind = if hard { "HARD" } else { "SOFT" };
        self.server_action(id, "reboot", json!({"type": kind})).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn keypairs(&self) -> Result<Vec<KeyPair>> {
        let items: Vec<KeyPairItem> = self
            .client
            .get_keyed(&["os-keypairs"], "keypairs", &[])
            .await?;
        Ok(items.into_iter().map(|i| i.keypair).collect())
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn keypair(&self, name: &str) -> Result<KeyPair> {
        self.client
            .get_keyed(&["os-keypairs", name], "keypair", &[])
            .await
    }

    /// Imports `public_key`, or asks the server to generate a pair when `None`.
    ///
    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn create_keypair(&self, name: &str, public_key: Option<&str>) -> Result<KeyPair> {
        let mut body = json!({"name": name});
        if let Some(key) = public_key {
            body["public_key"] = Value::from(key);
        }
        self.client
            .post_keyed(&["os-keypairs"], "keypair", &body)
            .await
    }

    /// # Errors
    ///
    /// Returns the dispatch error.
    pub async fn delete_keypair(&self, name: &str) -> Result<()> {
        self.client.delete(&["os-keypairs", name]).await?;
        Ok(())
    }
}
