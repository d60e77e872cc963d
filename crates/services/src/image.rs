//! Image v1 listing with query filters.

use crate::client::ServiceClient;
use chrono::NaiveDateTime;
use ostack_session::Session;
use ostack_types::{Interface, traits::Result};
use serde::Deserialize;
use std::{collections::HashMap, fmt, sync::Arc};

pub const SERVICE_TYPE: &str = "image";
const API_VERSION: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "asc"),
            Self::Desc => write!(f, "desc"),
        }
    }
}

/// Filters and paging for image listings. Unset fields are omitted.
#[derive(Debug, Clone, Default)]
pub struct ImageQuery {
    pub name: Option<String>,
    pub status: Option<String>,
    pub container_format: Option<String>,
    pub disk_format: Option<String>,
    pub size_min: Option<u64>,
    pub size_max: Option<u64>,
    pub sort_key: Option<String>,
    pub sort_dir: Option<SortDirection>,
    pub marker: Option<String>,
    pub limit: Option<u64>,
}

impl ImageQuery {
    /// Query string pairs in a stable order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((key, value));
            }
        };
        push("name", self.name.clone());
        push("container_format", self.container_format.clone());
        push("disk_format", self.disk_format.clone());
        push("status", self.status.clone());
        push("size_min", self.size_min.map(|v| v.to_string()));
        push("size_max", self.size_max.map(|v| v.to_string()));
        push("limit", self.limit.map(|v| v.to_string()));
        push("marker", self.marker.clone());
        push("sort_key", self.sort_key.clone());
        push("sort_dir", self.sort_dir.map(|d| d.to_string()));
        pairs
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub container_format: Option<String>,
    #[serde(default)]
    pub disk_format: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// Image v1 timestamps carry no zone, e.g. `2014-02-05T17:43:37`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageDetail {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub container_format: Option<String>,
    #[serde(default)]
    pub disk_format: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub virtual_size: Option<u64>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub min_disk: u64,
    #[serde(default)]
    pub min_ram: u64,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ImageClient {
    client: ServiceClient,
}

impl ImageClient {
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

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn images(&self) -> Result<Vec<Image>> {
        self.query_images(&ImageQuery::default()).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn images_detail(&self) -> Result<Vec<ImageDetail>> {
        self.query_images_detail(&ImageQuery::default()).await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn query_images(&self, query: &ImageQuery) -> Result<Vec<Image>> {
        let pairs = query.to_pairs();
        self.client
            .get_keyed(&["images"], "images", &borrow_pairs(&pairs))
            .await
    }

    /// # Errors
    ///
    /// Returns the dispatch or decode error.
    pub async fn query_images_detail(&self, query: &ImageQuery) -> Result<Vec<ImageDetail>> {
        let pairs = query.to_pairs();
        self.client
            .get_keyed(&["images", "detail"], "images", &borrow_pairs(&pairs))
            .await
    }
}

fn borrow_pairs<'a>(pairs: &'a [(&'static str, String)]) -> Vec<(&'a str, &'a str)> {
    pairs.iter().map(|(k, v)| (*k, v.as_str())).collect()
}
