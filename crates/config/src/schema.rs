use ostack_types::Interface;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::{collections::BTreeMap, path::PathBuf, time::Duration};

/// Environment variable prefix, matching the OpenStack `openrc` conventions.
pub const ENV_PREFIX: &str = "OS_";

/// TLS settings for the HTTP transport.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Skip server certificate verification.
    pub insecure: bool,
    /// Additional PEM CA bundle to trust.
    pub ca_cert: Option<PathBuf>,
}

/// Top-level client configuration.
///
/// Field names follow the `OS_*` environment variables with the prefix
/// stripped, so `OS_AUTH_URL` populates [`Config::auth_url`]. Secrets are
/// held as [`SecretString`] and print as `[REDACTED]`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity service URL, e.g. `https://keystone.example.com:5000/v2.0`.
    pub auth_url: Option<String>,
    /// Identity API version (`2` or `3`, defaults to 2).
    #[serde(deserialize_with = "opt_string")]
    pub identity_api_version: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub username: Option<String>,
    #[serde(deserialize_with = "opt_secret")]
    pub password: Option<SecretString>,
    /// User id, used by identity v3 password authentication.
    #[serde(deserialize_with = "opt_string")]
    pub user_id: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub access_key: Option<String>,
    #[serde(deserialize_with = "opt_secret")]
    pub secret_key: Option<SecretString>,
    /// Existing token id for token exchange.
    #[serde(deserialize_with = "opt_secret")]
    pub token: Option<SecretString>,
    #[serde(deserialize_with = "opt_string")]
    pub tenant_name: Option<String>,
    #[serde(deserialize_with = "opt_string")]
    pub tenant_id: Option<String>,
    /// v3 spelling of `tenant_name`.
    #[serde(deserialize_with = "opt_string")]
    pub project_name: Option<String>,
    /// v3 spelling of `tenant_id`.
    #[serde(deserialize_with = "opt_string")]
    pub project_id: Option<String>,
    /// Region used for catalog lookups (empty matches any region).
    #[serde(deserialize_with = "opt_string")]
    pub region_name: Option<String>,
    /// Endpoint interface used for catalog lookups.
    pub interface: Interface,
    pub tls: TlsConfig,
    /// Accept compressed responses (off by default).
    pub compression: bool,
    /// Whole-request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Optional outbound proxy URL.
    pub proxy_url: Option<String>,
    /// Dump requests and responses at debug level.
    pub debug: bool,
    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,
}

impl Config {
    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Format as _, Yaml},
        };
        Figment::new().merge(Yaml::string(yaml)).extract()
    }

    /// Loads configuration from a file path, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: &std::path::Path) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Format as _, Yaml},
        };
        Figment::new().merge(Yaml::file(path)).extract()
    }

    /// Loads configuration from `OS_*` environment variables only.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if a variable cannot be converted.
    #[allow(clippy::result_large_err)]
    pub fn from_env() -> Result<Self, figment::Error> {
        figment::Figment::new().merge(env_provider()).extract()
    }

    /// Layered load: defaults, then the optional YAML file, then `OS_*`
    /// environment variables (highest precedence).
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file or a variable cannot be parsed.
    #[allow(clippy::result_large_err)]
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, figment::Error> {
        use figment::{
            Figment,
            providers::{Format as _, Yaml},
        };
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Self = figment.merge(env_provider()).extract()?;
        tracing::debug!(config = ?config, "configuration loaded");
        Ok(config)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Region for catalog lookups; empty when unset.
    #[must_use]
    pub fn region(&self) -> &str {
        self.region_name.as_deref().unwrap_or_default()
    }
}

fn env_provider() -> figment::providers::Env {
    figment::providers::Env::prefixed(ENV_PREFIX).split("__")
}

/// Accepts a string, number or boolean. Environment values such as a numeric
/// tenant id or `OS_IDENTITY_API_VERSION=3` arrive as typed values from figment.
fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }
    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Str(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
        Raw::Bool(b) => b.to_string(),
    }))
}

fn opt_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.map(SecretString::from))
}
