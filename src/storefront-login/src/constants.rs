//! Constants for the storefront-login crate.

/// User-Agent sent on every outbound request. Some identity providers
/// answer unidentified clients with 403.
pub const USER_AGENT: &str = concat!("storefront-login/", env!("CARGO_PKG_VERSION"));

/// Scopes requested on every authorization attempt.
pub const SCOPES: &str = "openid email customer-account-api:full";

/// Well-known path of the OpenID configuration document.
pub const OPENID_DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Well-known path of the customer API discovery document.
pub const CUSTOMER_API_DISCOVERY_PATH: &str = "/.well-known/customer-account-api";

/// Base URL for endpoints constructed directly from a shop id.
pub const SHOP_AUTH_BASE_URL: &str = "https://shopify.com";

/// Default length of the generated nonce.
pub const DEFAULT_NONCE_LENGTH: usize = 16;

/// Default path that starts a new authorization attempt.
pub const DEFAULT_LOGIN_PATH: &str = "/account/login";

/// Default customer API version used when endpoints are built from a shop id.
pub const DEFAULT_API_VERSION: &str = "2025-07";

/// Timeout for every request to the identity provider or customer API.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Prefix shared by all configuration environment variables.
pub const ENV_PREFIX: &str = "STOREFRONT_AUTH_";
