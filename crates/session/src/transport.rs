//! HTTP transport shared by the session and the token providers.

use crate::request::RequestDescriptor;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use ostack_config::Config;
use ostack_types::{Envelope, OsError, traits::Result};
use std::{fmt::Write as _, path::PathBuf, time::Duration};

/// Headers whose values are never written to logs.
const REDACTED_HEADERS: &[&str] = &["x-auth-token", "x-subject-token", "authorization"];

/// Settings for building a [`Transport`].
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Skip server certificate verification.
    pub insecure: bool,
    /// Extra PEM bundle added to the trusted roots.
    pub ca_cert: Option<PathBuf>,
    /// Accept gzip-compressed responses.
    pub compression: bool,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub proxy_url: Option<String>,
    /// Dump every request and response at debug level.
    pub debug: bool,
}

impl TransportOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            insecure: config.tls.insecure,
            ca_cert: config.tls.ca_cert.clone(),
            compression: config.compression,
            timeout: config.timeout(),
            connect_timeout: config.connect_timeout(),
            proxy_url: config.proxy_url.clone(),
            debug: config.debug,
        }
    }
}

/// Configured HTTP client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    debug: bool,
}

impl Transport {
    /// Builds a transport from options.
    ///
    /// An unparsable proxy URL is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::Config`] if the CA bundle cannot be read or the
    /// client cannot be built.
    pub fn new(options: &TransportOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .gzip(options.compression)
            .danger_accept_invalid_certs(options.insecure);

        if let Some(path) = &options.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                OsError::Config(format!("reading CA bundle {}: {e}", path.display()))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                OsError::Config(format!("parsing CA bundle {}: {e}", path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(url) = options.proxy_url.as_deref() {
            match reqwest::Proxy::all(url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => {
                    tracing::warn!(url = url, error = %e, "invalid proxy_url, using direct connection");
                }
            }
        }

        let http = builder
            .build()
            .map_err(|e| OsError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            debug: options.debug,
        })
    }

    /// Builds a transport from the loaded configuration.
    ///
    /// # Errors
    ///
    /// See [`Transport::new`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&TransportOptions::from_config(config))
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Sends one request and returns the response with its body unread.
    ///
    /// # Errors
    ///
    /// Returns [`OsError::InvalidRequest`] for an unparsable URL and
    /// [`OsError::Transport`] for network failures.
    pub async fn execute(&self, req: RequestDescriptor) -> Result<RawResponse> {
        let url = reqwest::Url::parse(&req.url)
            .map_err(|e| OsError::InvalidRequest(format!("url {:?}: {e}", req.url)))?;

        if self.debug {
            tracing::debug!(
                method = %req.method,
                url = %url,
                query = ?req.query,
                headers = %redact_headers(&req.headers),
                body = %loggable_body(req.body.as_deref(), req.sensitive),
                "request"
            );
        }

        let mut builder = self.http.request(req.method, url).headers(req.headers);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(|e| transport_error(&req.url, &e))?;
        Ok(RawResponse {
            url: req.url,
            sensitive: req.sensitive,
            debug: self.debug,
            inner: resp,
        })
    }

    /// [`execute`](Self::execute) followed by [`RawResponse::drain`].
    ///
    /// # Errors
    ///
    /// See [`Transport::execute`] and [`RawResponse::drain`].
    pub async fn send(&self, req: RequestDescriptor) -> Result<Envelope> {
        self.execute(req).await?.drain().await
    }
}

/// Status and headers of a response whose body is still on the wire.
#[derive(Debug)]
pub struct RawResponse {
    url: String,
    sensitive: bool,
    debug: bool,
    inner: reqwest::Response,
}

impl RawResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reads the body to the end and returns the complete [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`OsError::Transport`] if the connection fails mid-body.
    pub async fn drain(self) -> Result<Envelope> {
        let status = self.inner.status();
        let headers = self.inner.headers().clone();
        let body: Bytes = self
            .inner
            .bytes()
            .await
            .map_err(|e| transport_error(&self.url, &e))?;

        if self.debug {
            tracing::debug!(
                url = %self.url,
                status = status.as_u16(),
                headers = %redact_headers(&headers),
                body = %loggable_body(Some(&body), self.sensitive),
                "response"
            );
        }
        Ok(Envelope::new(status, headers, body))
    }
}

fn transport_error(url: &str, e: &reqwest::Error) -> OsError {
    let message = if e.is_timeout() {
        format!("timed out: {e}")
    } else {
        e.to_string()
    };
    OsError::Transport {
        url: url.to_string(),
        message,
    }
}

/// Renders headers as `name: value` lines with secret values masked.
pub(crate) fn redact_headers(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in headers {
        let shown = if REDACTED_HEADERS.contains(&name.as_str()) || value.is_sensitive() {
            "[REDACTED]"
        } else {
            value.to_str().unwrap_or("<binary>")
        };
        let _ = write!(out, "{name}: {shown}; ");
    }
    out
}

fn loggable_body(body: Option<&[u8]>, sensitive: bool) -> String {
    match body {
        None => String::new(),
        Some(_) if sensitive => "[REDACTED]".to_string(),
        Some(b) => String::from_utf8_lossy(b).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use httpmock::prelude::*;

    #[test]
    fn test_redact_headers() {
        let mut h = HeaderMap::new();
        h.insert("x-auth-token", HeaderValue::from_static("abc123"));
        h.insert("X-Subject-Token", HeaderValue::from_static("def456"));
        h.insert("accept", HeaderValue::from_static("application/json"));
        let out = redact_headers(&h);
        assert!(!out.contains("abc123"));
        assert!(!out.contains("def456"));
        assert!(out.contains("accept: application/json"));
    }

    #[test]
    fn test_sensitive_header_value_redacted() {
        let mut h = HeaderMap::new();
        let mut v = HeaderValue::from_static("secret");
        v.set_sensitive(true);
        h.insert("x-custom", v);
        assert!(!redact_headers(&h).contains("secret"));
    }

    #[test]
    fn test_loggable_body() {
        assert_eq!(loggable_body(Some(b"{\"a\":1}"), false), "{\"a\":1}");
        assert_eq!(loggable_body(Some(b"password"), true), "[REDACTED]");
        assert_eq!(loggable_body(None, true), "");
    }

    #[test]
    fn test_options_from_config() {
        let config = Config::from_yaml(
            "compression: true\ntimeout_secs: 5\ndebug: true\ntls:\n  insecure: true",
        )
        .unwrap();
        let opts = TransportOptions::from_config(&config);
        assert!(opts.compression);
        assert!(opts.insecure);
        assert!(opts.debug);
        assert_eq!(opts.timeout, Some(Duration::from_secs(5)));
        assert!(Transport::new(&opts).unwrap().debug());
    }

    #[test]
    fn test_missing_ca_bundle_is_config_error() {
        let opts = TransportOptions {
            ca_cert: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..TransportOptions::default()
        };
        assert!(matches!(Transport::new(&opts), Err(OsError::Config(_))));
    }

    #[tokio::test]
    async fn test_send_drains_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/v2.0/networks").query_param("limit", "1");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"networks":[]}"#);
            })
            .await;

        let transport = Transport::new(&TransportOptions::default()).unwrap();
        let req = RequestDescriptor::get(server.url("/v2.0/networks")).query([("limit", "1")]);
        let env = transport.send(req).await.unwrap();

        mock.assert_async().await;
        assert_eq!(env.status(), StatusCode::OK);
        assert!(env.is_json());
        assert_eq!(env.body().as_ref(), br#"{"networks":[]}"#);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let transport = Transport::new(&TransportOptions::default()).unwrap();
        let err = transport
            .send(RequestDescriptor::get("http://127.0.0.1:1/"))
            .await
            .unwrap_err();
        match err {
            OsError::Transport { url, .. } => assert_eq!(url, "http://127.0.0.1:1/"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_url_is_invalid_request() {
        let transport = Transport::new(&TransportOptions::default()).unwrap();
        let err = transport
            .send(RequestDescriptor::get("not a url"))
            .await
            .unwrap_err();
        assert!(matches!(err, OsError::InvalidRequest(_)));
    }
}
