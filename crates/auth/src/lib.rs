//! Identity service token providers.
//!
//! Each sub-module implements one identity API version: request body
//! building, response parsing and the [`TokenProvider`] impl. [`from_config`]
//! picks the provider the configuration describes.

pub mod flow;
pub mod v2;
pub mod v3;

pub use v2::IdentityV2;
pub use v3::IdentityV3;

use ostack_config::{AuthSettings, Config, IdentityVersion};
use ostack_session::Transport;
use ostack_types::{TokenProvider, traits::Result};
use std::sync::Arc;

/// Builds the token provider selected by `config`.
///
/// # Errors
///
/// Returns [`ostack_types::OsError::Config`] if the auth URL, identity
/// version or credentials are missing or inconsistent.
pub fn from_config(config: &Config, transport: Transport) -> Result<Arc<dyn TokenProvider>> {
    let auth_url = config.identity_url()?;
    let settings = config.auth_settings()?;
    let provider: Arc<dyn TokenProvider> = match (config.identity_version()?, settings) {
        (
            IdentityVersion::V3,
            AuthSettings::V3Password {
                user_id,
                password,
                project_id,
            },
        ) => Arc::new(IdentityV3::password(
            transport,
            auth_url,
            &user_id,
            password,
            project_id.as_deref(),
        )),
        (_, settings) => Arc::new(IdentityV2::new(transport, auth_url, settings)?),
    };
    tracing::debug!(
        auth_url = auth_url,
        method = %provider.method(),
        "token provider configured"
    );
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ostack_session::TransportOptions;
    use ostack_types::{AuthMethod, OsError};

    fn transport() -> Transport {
        Transport::new(&TransportOptions::default()).unwrap()
    }

    #[test]
    fn test_from_config_v2_password() {
        let config = Config::from_yaml(
            "auth_url: http://keystone:5000/v2.0\nusername: alice\npassword: pw\ntenant_name: demo",
        )
        .unwrap();
        let provider = from_config(&config, transport()).unwrap();
        assert_eq!(provider.method(), AuthMethod::Password);
    }

    #[test]
    fn test_from_config_access_key() {
        let config =
            Config::from_yaml("auth_url: http://keystone/v2.0\naccess_key: ak\nsecret_key: sk")
                .unwrap();
        assert_eq!(
            from_config(&config, transport()).unwrap().method(),
            AuthMethod::AccessKey
        );
    }

    #[test]
    fn test_from_config_v3() {
        let config = Config::from_yaml(
            "auth_url: http://keystone/v3\nidentity_api_version: 3\nuser_id: uid\npassword: pw",
        )
        .unwrap();
        assert_eq!(
            from_config(&config, transport()).unwrap().method(),
            AuthMethod::V3Password
        );
    }

    #[test]
    fn test_from_config_requires_auth_url() {
        let config = Config::from_yaml("username: alice\npassword: pw").unwrap();
        assert!(matches!(
            from_config(&config, transport()),
            Err(OsError::Config(_))
        ));
    }
}
