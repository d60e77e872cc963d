//! Service endpoint catalog returned by the identity service.

use crate::{OsError, traits::Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of an endpoint's URLs to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interface {
    #[default]
    Public,
    Internal,
    Admin,
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Internal => write!(f, "internal"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Interface {
    type Err = OsError;

    /// Parse an interface name; the `URL` suffixed forms used by the v2
    /// catalog (`publicURL`, ...) are accepted too.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" | "publicurl" => Ok(Self::Public),
            "internal" | "internalurl" => Ok(Self::Internal),
            "admin" | "adminurl" => Ok(Self::Admin),
            other => Err(OsError::Config(format!("unknown endpoint interface: {other}"))),
        }
    }
}

/// One regional endpoint of a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

impl Endpoint {
    #[must_use]
    pub fn url(&self, interface: Interface) -> Option<&str> {
        match interface {
            Interface::Public => self.public_url.as_deref(),
            Interface::Internal => self.internal_url.as_deref(),
            Interface::Admin => self.admin_url.as_deref(),
        }
    }

    /// Set the URL for one interface, used when merging v3 catalog entries.
    pub fn set_url(&mut self, interface: Interface, url: String) {
        match interface {
            Interface::Public => self.public_url = Some(url),
            Interface::Internal => self.internal_url = Some(url),
            Interface::Admin => self.admin_url = Some(url),
        }
    }
}

/// A catalog entry: one service type and its endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogService {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub endpoints: Vec<Endpoint>,
}

/// Mapping from (service type, region, interface) to a base URL.
///
/// Built once per authentication and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCatalog {
    services: Vec<CatalogService>,
}

impl ServiceCatalog {
    #[must_use]
    pub fn new(services: Vec<CatalogService>) -> Self {
        Self { services }
    }

    #[must_use]
    pub fn services(&self) -> &[CatalogService] {
        &self.services
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Look up the first endpoint of `service_type` in `region`.
    ///
    /// An empty `region` matches any region.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::EndpointNotFound`] if no endpoint has a URL for the
    /// requested interface.
    pub fn endpoint(&self, service_type: &str, region: &str, interface: Interface) -> Result<&str> {
        self.services
            .iter()
            .filter(|s| s.service_type == service_type)
            .flat_map(|s| s.endpoints.iter())
            .filter(|e| region.is_empty() || e.region.as_deref() == Some(region))
            .find_map(|e| e.url(interface))
            .ok_or_else(|| OsError::EndpointNotFound {
                service_type: service_type.to_string(),
                region: region.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ServiceCatalog {
        ServiceCatalog::new(vec![
            CatalogService {
                name: "nova".into(),
                service_type: "compute".into(),
                endpoints: vec![
                    Endpoint {
                        region: Some("region-a".into()),
                        public_url: Some("https://a.compute/v2/t1".into()),
                        internal_url: Some("http://a.internal/v2/t1".into()),
                        ..Endpoint::default()
                    },
                    Endpoint {
                        region: Some("region-b".into()),
                        public_url: Some("https://b.compute/v2/t1".into()),
                        ..Endpoint::default()
                    },
                ],
            },
            CatalogService {
                name: "neutron".into(),
                service_type: "network".into(),
                endpoints: vec![Endpoint {
                    region: Some("region-b".into()),
                    public_url: Some("https://b.network".into()),
                    ..Endpoint::default()
                }],
            },
        ])
    }

    #[test]
    fn test_endpoint_by_region() {
        let c = catalog();
        assert_eq!(
            c.endpoint("compute", "region-b", Interface::Public).unwrap(),
            "https://b.compute/v2/t1"
        );
    }

    #[test]
    fn test_endpoint_any_region() {
        let c = catalog();
        assert_eq!(
            c.endpoint("compute", "", Interface::Public).unwrap(),
            "https://a.compute/v2/t1"
        );
    }

    #[test]
    fn test_endpoint_interface() {
        let c = catalog();
        assert_eq!(
            c.endpoint("compute", "region-a", Interface::Internal).unwrap(),
            "http://a.internal/v2/t1"
        );
        assert!(c.endpoint("compute", "region-b", Interface::Internal).is_err());
    }

    #[test]
    fn test_endpoint_not_found() {
        let err = catalog()
            .endpoint("volumev3", "region-a", Interface::Public)
            .unwrap_err();
        assert!(matches!(err, OsError::EndpointNotFound { .. }));
        assert!(err.to_string().contains("volumev3"));
    }

    #[test]
    fn test_interface_from_str() {
        assert_eq!("publicURL".parse::<Interface>().unwrap(), Interface::Public);
        assert_eq!("internal".parse::<Interface>().unwrap(), Interface::Internal);
        assert!("private".parse::<Interface>().is_err());
    }
}
