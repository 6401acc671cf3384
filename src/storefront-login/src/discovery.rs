//! Endpoint discovery.
//!
//! Resolves the identity provider's OAuth endpoints and the customer API
//! endpoint from a shop domain, or builds the provider endpoints directly
//! from a shop id. Nothing here caches or retries.

use serde::Deserialize;

use crate::constants::{
    CUSTOMER_API_DISCOVERY_PATH, OPENID_DISCOVERY_PATH, SHOP_AUTH_BASE_URL, USER_AGENT,
};
use crate::error::{AuthError, DiscoveryKind, Result};

/// OpenID provider metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpenIdConfiguration {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
}

/// Customer API discovery document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomerApiConfig {
    pub graphql_api: String,
    #[serde(default)]
    pub mcp_api: Option<String>,
}

/// The OAuth endpoints a login flow talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEndpoints {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub end_session_endpoint: Option<String>,
}

impl AuthEndpoints {
    /// Build the endpoints for a shop id without a network call.
    pub fn from_shop_id(shop_id: &str) -> Self {
        let base = format!("{SHOP_AUTH_BASE_URL}/authentication/{shop_id}");
        Self {
            authorization_endpoint: format!("{base}/oauth/authorize"),
            token_endpoint: format!("{base}/oauth/token"),
            end_session_endpoint: Some(format!("{base}/logout")),
        }
    }
}

impl From<OpenIdConfiguration> for AuthEndpoints {
    fn from(config: OpenIdConfiguration) -> Self {
        Self {
            authorization_endpoint: config.authorization_endpoint,
            token_endpoint: config.token_endpoint,
            end_session_endpoint: config.end_session_endpoint,
        }
    }
}

/// Customer API GraphQL endpoint built from a shop id.
pub fn graphql_endpoint_for_shop_id(shop_id: &str, api_version: &str) -> String {
    format!("{SHOP_AUTH_BASE_URL}/{shop_id}/account/customer/api/{api_version}/graphql")
}

/// Turn a bare or scheme-qualified domain into a discovery URL.
fn discovery_url(domain: &str, path: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        format!("{domain}{path}")
    } else {
        format!("https://{domain}{path}")
    }
}

/// Fetch the OpenID configuration for `domain`.
pub async fn discover_openid_configuration(
    http: &reqwest::Client,
    domain: &str,
) -> Result<OpenIdConfiguration> {
    fetch_document(
        http,
        DiscoveryKind::OpenId,
        discovery_url(domain, OPENID_DISCOVERY_PATH),
    )
    .await
}

/// Fetch the customer API discovery document for `domain`.
pub async fn discover_customer_api(
    http: &reqwest::Client,
    domain: &str,
) -> Result<CustomerApiConfig> {
    fetch_document(
        http,
        DiscoveryKind::CustomerApi,
        discovery_url(domain, CUSTOMER_API_DISCOVERY_PATH),
    )
    .await
}

async fn fetch_document<T>(http: &reqwest::Client, kind: DiscoveryKind, url: String) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    tracing::debug!(%kind, url = %url, "Fetching discovery document");

    let response = match http
        .get(&url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(%kind, url = %url, error = %e, "Discovery request failed");
            return Err(AuthError::Discovery {
                kind,
                url,
                status: None,
                reason: e.to_string(),
            });
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(
            %kind,
            url = %url,
            status = %status,
            "Discovery returned non-success status"
        );
        return Err(AuthError::Discovery {
            kind,
            url,
            status: Some(status.as_u16()),
            reason: format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )
            .trim_end()
            .to_string(),
        });
    }

    response.json::<T>().await.map_err(|e| AuthError::Discovery {
        kind,
        url,
        status: Some(status.as_u16()),
        reason: format!("invalid discovery document: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_discovery_url_forms() {
        assert_eq!(
            discovery_url("shop.example", OPENID_DISCOVERY_PATH),
            "https://shop.example/.well-known/openid-configuration"
        );
        assert_eq!(
            discovery_url("https://shop.example/", CUSTOMER_API_DISCOVERY_PATH),
            "https://shop.example/.well-known/customer-account-api"
        );
        assert_eq!(
            discovery_url("http://127.0.0.1:8080", OPENID_DISCOVERY_PATH),
            "http://127.0.0.1:8080/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_endpoints_from_shop_id() {
        let endpoints = AuthEndpoints::from_shop_id("12345");
        assert_eq!(
            endpoints,
            AuthEndpoints {
                authorization_endpoint: "https://shopify.com/authentication/12345/oauth/authorize"
                    .into(),
                token_endpoint: "https://shopify.com/authentication/12345/oauth/token".into(),
                end_session_endpoint: Some(
                    "https://shopify.com/authentication/12345/logout".into()
                ),
            }
        );
        assert_eq!(
            graphql_endpoint_for_shop_id("12345", "2025-07"),
            "https://shopify.com/12345/account/customer/api/2025-07/graphql"
        );
    }

    #[tokio::test]
    async fn test_discover_openid_configuration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issuer": "https://idp.example",
                "authorization_endpoint": "https://idp.example/oauth/authorize",
                "token_endpoint": "https://idp.example/oauth/token",
                "end_session_endpoint": "https://idp.example/logout",
                "jwks_uri": "https://idp.example/jwks"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = discover_openid_configuration(&reqwest::Client::new(), &server.uri())
            .await
            .unwrap();
        assert_eq!(config.token_endpoint, "https://idp.example/oauth/token");
        assert_eq!(config.jwks_uri.as_deref(), Some("https://idp.example/jwks"));

        let endpoints = AuthEndpoints::from(config);
        assert_eq!(
            endpoints.end_session_endpoint.as_deref(),
            Some("https://idp.example/logout")
        );
    }

    #[tokio::test]
    async fn test_discovery_sends_user_agent_on_bare_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/customer-account-api"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "graphql_api": "https://shop.example/account/customer/api/graphql"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issuer": "https://idp.example",
                "authorization_endpoint": "https://idp.example/oauth/authorize",
                "token_endpoint": "https://idp.example/oauth/token"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        discover_customer_api(&http, &server.uri()).await.unwrap();
        discover_openid_configuration(&http, &server.uri())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_discover_customer_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/customer-account-api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "graphql_api": "https://shop.example/account/customer/api/graphql",
                "mcp_api": "https://shop.example/account/customer/api/mcp"
            })))
            .mount(&server)
            .await;

        let config = discover_customer_api(&reqwest::Client::new(), &server.uri())
            .await
            .unwrap();
        assert_eq!(
            config.graphql_api,
            "https://shop.example/account/customer/api/graphql"
        );
    }

    #[tokio::test]
    async fn test_discovery_failure_carries_status_and_kind() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = discover_openid_configuration(&reqwest::Client::new(), &server.uri())
            .await
            .unwrap_err();
        match &err {
            AuthError::Discovery {
                kind, status, url, ..
            } => {
                assert_eq!(*kind, DiscoveryKind::OpenId);
                assert_eq!(*status, Some(404));
                assert!(url.ends_with("/.well-known/openid-configuration"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("404 Not Found"));

        let err = discover_customer_api(&reqwest::Client::new(), &server.uri())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Discovery {
                kind: DiscoveryKind::CustomerApi,
                ..
            }
        ));
        assert_eq!(err.error_code(), "discovery_failed");
    }
}
