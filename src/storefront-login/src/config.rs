//! Client configuration.
//!
//! Resolved once per process from explicit values or environment variables.
//! Each field has exactly one variable name, all prefixed with
//! `STOREFRONT_AUTH_`.

use serde::Deserialize;
use url::Url;

use crate::constants::{DEFAULT_API_VERSION, DEFAULT_LOGIN_PATH, ENV_PREFIX};
use crate::error::{AuthError, Result};

/// Settings identifying this storefront to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthConfig {
    /// OAuth client id registered with the identity provider.
    pub client_id: String,
    /// Numeric shop id. When present, endpoints are built directly from it.
    #[serde(default)]
    pub shop_id: Option<String>,
    /// Shop domain used for endpoint discovery when no shop id is set.
    #[serde(default)]
    pub shop_domain: Option<String>,
    /// Absolute callback URL registered with the identity provider.
    pub redirect_uri: String,
    /// Route that starts a new authorization attempt.
    #[serde(default = "default_login_path")]
    pub login_path: String,
    /// Where the identity provider sends the browser after logout.
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
    /// Locale forwarded to the authorization page.
    #[serde(default)]
    pub locale: Option<String>,
    /// Customer API version for endpoints built from a shop id.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_login_path() -> String {
    DEFAULT_LOGIN_PATH.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl AuthConfig {
    /// Create a configuration with the required fields and defaults for the rest.
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            shop_id: None,
            shop_domain: None,
            redirect_uri: redirect_uri.into(),
            login_path: default_login_path(),
            post_logout_redirect_uri: None,
            locale: None,
            api_version: default_api_version(),
        }
    }

    pub fn with_shop_id(mut self, shop_id: impl Into<String>) -> Self {
        self.shop_id = Some(shop_id.into());
        self
    }

    pub fn with_shop_domain(mut self, shop_domain: impl Into<String>) -> Self {
        self.shop_domain = Some(shop_domain.into());
        self
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    pub fn with_post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.post_logout_redirect_uri = Some(uri.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |field: &str| {
            lookup(&format!("{ENV_PREFIX}{field}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |field: &str| {
            get(field).ok_or_else(|| {
                AuthError::Configuration(format!("{ENV_PREFIX}{field} is not set"))
            })
        };

        let config = Self {
            client_id: require("CLIENT_ID")?,
            shop_id: get("SHOP_ID"),
            shop_domain: get("SHOP_DOMAIN"),
            redirect_uri: require("REDIRECT_URI")?,
            login_path: get("LOGIN_PATH").unwrap_or_else(default_login_path),
            post_logout_redirect_uri: get("LOGOUT_REDIRECT_URI"),
            locale: get("LOCALE"),
            api_version: get("API_VERSION").unwrap_or_else(default_api_version),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a login.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Configuration("client id is empty".into()));
        }

        let has_shop_id = self.shop_id.as_deref().is_some_and(|s| !s.trim().is_empty());
        let has_domain = self
            .shop_domain
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if !has_shop_id && !has_domain {
            return Err(AuthError::Configuration(
                "either a shop id or a shop domain is required".into(),
            ));
        }

        let redirect = Url::parse(&self.redirect_uri).map_err(|e| {
            AuthError::Configuration(format!("redirect URI {:?}: {e}", self.redirect_uri))
        })?;
        if redirect.host_str().is_none() {
            return Err(AuthError::Configuration(format!(
                "redirect URI {:?} has no host",
                self.redirect_uri
            )));
        }

        if !self.login_path.starts_with('/') {
            return Err(AuthError::Configuration(format!(
                "login path {:?} must start with '/'",
                self.login_path
            )));
        }

        if let Some(uri) = &self.post_logout_redirect_uri {
            Url::parse(uri).map_err(|e| {
                AuthError::Configuration(format!("post-logout redirect URI {uri:?}: {e}"))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_full() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("STOREFRONT_AUTH_CLIENT_ID", "client-1"),
            ("STOREFRONT_AUTH_SHOP_ID", "12345"),
            ("STOREFRONT_AUTH_REDIRECT_URI", "https://shop.example/account/authorize"),
            ("STOREFRONT_AUTH_LOCALE", "fr"),
        ]))
        .unwrap();

        assert_eq!(config.client_id, "client-1");
        assert_eq!(config.shop_id.as_deref(), Some("12345"));
        assert_eq!(config.shop_domain, None);
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
        assert_eq!(config.locale.as_deref(), Some("fr"));
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_from_lookup_missing_client_id() {
        let err = AuthConfig::from_lookup(lookup(&[
            ("STOREFRONT_AUTH_SHOP_ID", "12345"),
            ("STOREFRONT_AUTH_REDIRECT_URI", "https://shop.example/callback"),
        ]))
        .unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
        assert_eq!(err.error_code(), "configuration_error");
    }

    #[test]
    fn test_blank_values_are_absent() {
        let err = AuthConfig::from_lookup(lookup(&[
            ("STOREFRONT_AUTH_CLIENT_ID", "client-1"),
            ("STOREFRONT_AUTH_SHOP_ID", "  "),
            ("STOREFRONT_AUTH_REDIRECT_URI", "https://shop.example/callback"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("shop id or a shop domain"));
    }

    #[test]
    fn test_validate_rejects_relative_redirect() {
        let config = AuthConfig::new("client-1", "/callback").with_shop_id("1");
        assert!(matches!(
            config.validate(),
            Err(AuthError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_login_path() {
        let config = AuthConfig::new("client-1", "https://shop.example/callback")
            .with_shop_domain("shop.example")
            .with_login_path("login");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: AuthConfig = serde_json::from_value(serde_json::json!({
            "client_id": "client-1",
            "shop_domain": "shop.example",
            "redirect_uri": "https://shop.example/callback"
        }))
        .unwrap();
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
        assert!(config.validate().is_ok());
    }
}
