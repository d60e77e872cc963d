//! Shared plumbing for resource clients.

use http::HeaderMap;
use ostack_session::Session;
use ostack_types::{Envelope, Interface, OsError, traits::Result};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::sync::Arc;

/// A session bound to one service base URL.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    session: Arc<Session>,
    base_url: String,
}

impl ServiceClient {
    #[must_use]
    pub fn new(session: Arc<Session>, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolves the base URL from the session's catalog, appending
    /// `version` when the catalog URL does not already end with it.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::EndpointNotFound`] or the authentication error.
    pub async fn from_catalog(
        session: Arc<Session>,
        service_type: &str,
        region: &str,
        interface: Interface,
        version: Option<&str>,
    ) -> Result<Self> {
        let mut url = session.endpoint(service_type, region, interface).await?;
        let trimmed = url.trim_end_matches('/');
        if let Some(version) = version {
            if !trimmed.ends_with(version) {
                url = format!("{trimmed}/{version}");
            }
        }
        tracing::debug!(service_type = service_type, url = %url, "resolved service endpoint");
        Ok(Self::new(session, &url))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Joins path segments onto the base URL.
    #[must_use]
    pub fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(segment.trim_matches('/'));
        }
        url
    }

    /// GETs `path` and decodes the value under `key`.
    pub(crate) async fn get_keyed<T: DeserializeOwned>(
        &self,
        path: &[&str],
        key: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let envelope = self
            .session
            .get(&self.url(path), query, HeaderMap::new())
            .await?;
        unwrap_key(&envelope, key)
    }

    /// POSTs `{key: body}` to `path` and decodes the value under `key`.
    pub(crate) async fn post_keyed<B, T>(&self, path: &[&str], key: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let wrapped = wrap_key(key, body)?;
        let envelope: Value = self.session.post_json(&self.url(path), &wrapped).await?;
        take_key(envelope, key)
    }

    /// PUTs `{key: body}` to `path` and decodes the value under `key`.
    pub(crate) async fn put_keyed<B, T>(&self, path: &[&str], key: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let wrapped = wrap_key(key, body)?;
        let envelope: Value = self.session.put_json(&self.url(path), &wrapped).await?;
        take_key(envelope, key)
    }

    pub(crate) async fn delete(&self, path: &[&str]) -> Result<Envelope> {
        self.session
            .delete(&self.url(path), &[], HeaderMap::new())
            .await
    }
}

fn wrap_key<B: Serialize + ?Sized>(key: &str, body: &B) -> Result<Value> {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), serde_json::to_value(body)?);
    Ok(Value::Object(map))
}

fn take_key<T: DeserializeOwned>(mut value: Value, key: &str) -> Result<T> {
    let inner = value
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| OsError::Format(format!("response has no {key:?} member")))?;
    serde_json::from_value(inner).map_err(|e| OsError::Format(format!("decoding {key:?}: {e}")))
}

pub(crate) fn unwrap_key<T: DeserializeOwned>(envelope: &Envelope, key: &str) -> Result<T> {
    take_key(envelope.json()?, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_join() {
        let session = Arc::new(Session::new(
            ostack_session::Transport::new(&ostack_session::TransportOptions::default()).unwrap(),
            None,
        ));
        let client = ServiceClient::new(session, "http://net:9696/v2.0/");
        assert_eq!(client.base_url(), "http://net:9696/v2.0");
        assert_eq!(client.url(&["networks", "n1"]), "http://net:9696/v2.0/networks/n1");
        assert_eq!(client.url(&[]), "http://net:9696/v2.0");
    }

    #[test]
    fn test_take_key() {
        let v: Vec<u32> = take_key(json!({"ids": [1, 2]}), "ids").unwrap();
        assert_eq!(v, vec![1, 2]);
        let err = take_key::<Vec<u32>>(json!({"other": []}), "ids").unwrap_err();
        assert!(matches!(err, OsError::Format(_)));
    }

    #[test]
    fn test_wrap_key() {
        let v = wrap_key("network", &json!({"name": "n"})).unwrap();
        assert_eq!(v, json!({"network": {"name": "n"}}));
    }
}
