//! Authenticated request dispatch.
//!
//! A [`Session`] owns the transport, an optional token provider and a set of
//! default headers. Every verb lazily authenticates, attaches the token,
//! merges headers, dispatches and classifies the status.

use crate::{
    request::{RequestDescriptor, parse_header},
    transport::Transport,
};
use arc_swap::{ArcSwap, ArcSwapOption};
use bytes::Bytes;
use chrono::TimeDelta;
use http::{
    HeaderMap, HeaderValue, Method,
    header::{CONTENT_TYPE, HeaderName},
};
use ostack_config::Config;
use ostack_types::{
    Credential, CredentialState, Envelope, Interface, OsError, Outcome, ServiceCatalog,
    TokenProvider, traits::Result,
};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Header carrying the credential id on every authenticated request.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Credentials expiring within this window are renewed before use.
const DEFAULT_RENEW_MARGIN: TimeDelta = TimeDelta::seconds(60);

/// Authentication state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No credential has been obtained yet (or it was invalidated).
    Unauthenticated,
    /// A credential is held and has not reached its expiry.
    Authenticated,
    /// A credential is held but its expiry has passed.
    Expired,
}

pub struct Session {
    transport: Transport,
    provider: Option<Arc<dyn TokenProvider>>,
    credential: ArcSwapOption<Credential>,
    catalog: ArcSwapOption<ServiceCatalog>,
    default_headers: ArcSwap<HeaderMap>,
    auth_lock: Mutex<()>,
    renew_margin: TimeDelta,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("provider", &self.provider.as_ref().map(|p| p.method()))
            .field("debug", &self.transport.debug())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session. Without a provider no `X-Auth-Token` is ever sent.
    #[must_use]
    pub fn new(transport: Transport, provider: Option<Arc<dyn TokenProvider>>) -> Self {
        Self {
            transport,
            provider,
            credential: ArcSwapOption::empty(),
            catalog: ArcSwapOption::empty(),
            default_headers: ArcSwap::from_pointee(HeaderMap::new()),
            auth_lock: Mutex::new(()),
            renew_margin: DEFAULT_RENEW_MARGIN,
        }
    }

    /// Builds the transport and default headers from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::Config`] if the transport cannot be built and
    /// [`OsError::InvalidRequest`] for an invalid configured header.
    pub fn from_config(config: &Config, provider: Option<Arc<dyn TokenProvider>>) -> Result<Self> {
        let session = Self::new(Transport::from_config(config)?, provider);
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let (name, value) = parse_header(name, value)?;
            headers.insert(name, value);
        }
        Ok(session.with_default_headers(headers))
    }

    #[must_use]
    pub fn with_default_headers(self, headers: HeaderMap) -> Self {
        self.default_headers.store(Arc::new(headers));
        self
    }

    /// Overrides how long before expiry a credential is renewed.
    #[must_use]
    pub fn with_renew_margin(mut self, margin: TimeDelta) -> Self {
        self.renew_margin = margin;
        self
    }

    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.credential.load().as_deref().map(Credential::state) {
            None => SessionState::Unauthenticated,
            Some(CredentialState::Live) => SessionState::Authenticated,
            Some(CredentialState::Expired) => SessionState::Expired,
        }
    }

    /// The currently held credential, live or not.
    #[must_use]
    pub fn credential(&self) -> Option<Arc<Credential>> {
        self.credential.load_full()
    }

    /// The catalog from the most recent authentication.
    #[must_use]
    pub fn catalog(&self) -> Option<Arc<ServiceCatalog>> {
        self.catalog.load_full()
    }

    /// Drops the held credential and catalog.
    pub fn invalidate(&self) {
        self.credential.store(None);
        self.catalog.store(None);
        tracing::debug!("session credential invalidated");
    }

    /// Authenticates now, replacing any held credential.
    ///
    /// On failure the session keeps its previous state.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::Config`] if the session has no provider, otherwise
    /// whatever the provider returns.
    pub async fn authenticate(&self) -> Result<Arc<Credential>> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| OsError::Config("session has no token provider".into()))?;
        let _guard = self.auth_lock.lock().await;
        self.renew(provider.as_ref()).await
    }

    async fn renew(&self, provider: &dyn TokenProvider) -> Result<Arc<Credential>> {
        let method = provider.method();
        let authenticated = provider.authenticate().await.inspect_err(|e| {
            tracing::warn!(method = %method, error = %e, "authentication failed");
        })?;
        let credential = Arc::new(authenticated.credential);
        // Catalog first so a reader that sees the new credential also sees its catalog.
        self.catalog.store(Some(Arc::new(authenticated.catalog)));
        self.credential.store(Some(Arc::clone(&credential)));
        tracing::info!(
            method = %method,
            expires_at = %credential.expires_at(),
            "authenticated"
        );
        Ok(credential)
    }

    fn usable_credential(&self) -> Option<Arc<Credential>> {
        self.credential
            .load_full()
            .filter(|c| !c.expires_within(self.renew_margin))
    }

    /// Returns a credential that is live for at least the renewal margin,
    /// authenticating if needed. Concurrent callers share one authentication.
    async fn ensure_credential(&self) -> Result<Option<Arc<Credential>>> {
        let Some(provider) = &self.provider else {
            return Ok(None);
        };
        if let Some(credential) = self.usable_credential() {
            return Ok(Some(credential));
        }
        let _guard = self.auth_lock.lock().await;
        if let Some(credential) = self.usable_credential() {
            return Ok(Some(credential));
        }
        self.renew(provider.as_ref()).await.map(Some)
    }

    /// Looks up a service base URL in the catalog, authenticating first if
    /// no credential is held yet.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::EndpointNotFound`] if no endpoint matches, or the
    /// authentication error.
    pub async fn endpoint(
        &self,
        service_type: &str,
        region: &str,
        interface: Interface,
    ) -> Result<String> {
        self.ensure_credential().await?;
        let not_found = || OsError::EndpointNotFound {
            service_type: service_type.to_string(),
            region: region.to_string(),
        };
        let catalog = self.catalog.load_full().ok_or_else(not_found)?;
        catalog
            .endpoint(service_type, region, interface)
            .map(str::to_string)
    }

    /// Adds or replaces a header sent with every request.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::InvalidRequest`] if the name or value is invalid.
    pub fn set_default_header(&self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.default_headers.rcu(|current| {
            let mut headers = HeaderMap::clone(current);
            headers.insert(name.clone(), value.clone());
            headers
        });
        Ok(())
    }

    pub fn remove_default_header(&self, name: &str) {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            return;
        };
        self.default_headers.rcu(|current| {
            let mut headers = HeaderMap::clone(current);
            headers.remove(&name);
            headers
        });
    }

    #[must_use]
    pub fn default_headers(&self) -> Arc<HeaderMap> {
        self.default_headers.load_full()
    }

    /// Header precedence, lowest first: defaults, `Content-Type`, auth
    /// token, then the request's own headers.
    fn merge_headers(&self, overrides: HeaderMap, credential: Option<&Credential>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::clone(&self.default_headers.load());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(credential) = credential {
            if !overrides.contains_key(AUTH_TOKEN_HEADER) {
                let mut token = HeaderValue::from_str(credential.id())
                    .map_err(|e| OsError::InvalidRequest(format!("token is not a valid header: {e}")))?;
                token.set_sensitive(true);
                headers.insert(AUTH_TOKEN_HEADER, token);
            }
        }
        headers.extend(overrides);
        Ok(headers)
    }

    /// Dispatches a fully described request.
    ///
    /// # Errors
    ///
    /// Returns the authentication error, [`OsError::Transport`] for network
    /// failures, or [`OsError::Status`] carrying the whole response for a
    /// non-success status.
    pub async fn request(&self, mut req: RequestDescriptor) -> Result<Envelope> {
        let credential = self.ensure_credential().await?;
        req.headers = self.merge_headers(std::mem::take(&mut req.headers), credential.as_deref())?;

        let method = req.method.clone();
        let url = req.url.clone();
        let envelope = self.transport.send(req).await?;
        match envelope.outcome() {
            Outcome::Success => Ok(envelope),
            Outcome::Failure(kind) => {
                tracing::debug!(method = %method, url = %url, status = %kind, "request failed");
                Err(OsError::Status {
                    method: method.to_string(),
                    url,
                    kind,
                    envelope: Box::new(envelope),
                })
            }
        }
    }

    fn describe(
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> RequestDescriptor {
        let mut req = RequestDescriptor::new(method, url)
            .query(query.iter().copied())
            .headers(headers);
        req.body = body;
        req
    }

    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn get(&self, url: &str, query: &[(&str, &str)], headers: HeaderMap) -> Result<Envelope> {
        self.request(Self::describe(Method::GET, url, query, headers, None))
            .await
    }

    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn post(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Envelope> {
        self.request(Self::describe(Method::POST, url, query, headers, body))
            .await
    }

    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn put(
        &self,
        url: &str,
        query: &[(&str, &str)],
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Envelope> {
        self.request(Self::describe(Method::PUT, url, query, headers, body))
            .await
    }

    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn delete(&self, url: &str, query: &[(&str, &str)], headers: HeaderMap) -> Result<Envelope> {
        self.request(Self::describe(Method::DELETE, url, query, headers, None))
            .await
    }

    /// # Errors
    ///
    /// See [`Session::request`].
    pub async fn head(&self, url: &str, query: &[(&str, &str)], headers: HeaderMap) -> Result<Envelope> {
        self.request(Self::describe(Method::HEAD, url, query, headers, None))
            .await
    }

    /// GET and decode the JSON body.
    ///
    /// # Errors
    ///
    /// See [`Session::request`]; [`OsError::Format`] if the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T> {
        self.get(url, query, HeaderMap::new()).await?.json()
    }

    /// POST a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`Session::request`]; [`OsError::Format`] if either body fails to (de)serialize.
    pub async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = RequestDescriptor::post(url).json(body)?;
        self.request(req).await?.json()
    }

    /// PUT a JSON body and decode the JSON response.
    ///
    /// # Errors
    ///
    /// See [`Session::post_json`].
    pub async fn put_json<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let req = RequestDescriptor::put(url).json(body)?;
        self.request(req).await?.json()
    }
}
