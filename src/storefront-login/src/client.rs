//! HTTP-facing client tying configuration, endpoint resolution and the
//! token endpoint together.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::config::AuthConfig;
use crate::constants::{HTTP_TIMEOUT_SECS, USER_AGENT};
use crate::discovery::{
    AuthEndpoints, discover_customer_api, discover_openid_configuration,
    graphql_endpoint_for_shop_id,
};
use crate::error::{AuthError, Result};
use crate::token::{self, CodeExchange, RefreshResponse, TokenResponse};

/// Authentication client for one storefront.
///
/// Endpoints are resolved in a fixed order: explicit endpoints, then the
/// shop id, then discovery against the shop domain. Discovered endpoints
/// are not cached.
#[derive(Debug, Clone)]
pub struct AuthClient {
    config: AuthConfig,
    http: reqwest::Client,
    endpoints: Option<AuthEndpoints>,
    graphql_endpoint: Option<String>,
}

impl AuthClient {
    /// Validate `config` and build a client for it.
    pub fn new(config: AuthConfig) -> Result<Self> {
        config.validate()?;
        let http = build_http_client()?;

        let shop_id = config
            .shop_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let endpoints = shop_id.map(AuthEndpoints::from_shop_id);
        let graphql_endpoint =
            shop_id.map(|id| graphql_endpoint_for_shop_id(id, &config.api_version));

        tracing::debug!(
            client_id = %config.client_id,
            direct_endpoints = endpoints.is_some(),
            "Created auth client"
        );

        Ok(Self {
            config,
            http,
            endpoints,
            graphql_endpoint,
        })
    }

    /// Use these OAuth endpoints instead of building or discovering them.
    pub fn with_endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Use this customer API endpoint instead of building or discovering it.
    pub fn with_graphql_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.graphql_endpoint = Some(endpoint.into());
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn shop_domain(&self) -> Result<&str> {
        self.config
            .shop_domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AuthError::Configuration("shop domain is not set".into()))
    }

    /// Resolve the OAuth endpoints.
    pub async fn endpoints(&self) -> Result<AuthEndpoints> {
        if let Some(endpoints) = &self.endpoints {
            return Ok(endpoints.clone());
        }
        let config = discover_openid_configuration(&self.http, self.shop_domain()?).await?;
        Ok(config.into())
    }

    /// Resolve the customer API GraphQL endpoint.
    pub async fn graphql_endpoint(&self) -> Result<String> {
        if let Some(endpoint) = &self.graphql_endpoint {
            return Ok(endpoint.clone());
        }
        let config = discover_customer_api(&self.http, self.shop_domain()?).await?;
        Ok(config.graphql_api)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenResponse> {
        let endpoints = self.endpoints().await?;
        token::exchange_code(
            &self.http,
            &endpoints.token_endpoint,
            &CodeExchange {
                client_id: &self.config.client_id,
                redirect_uri: &self.config.redirect_uri,
                code,
                code_verifier,
            },
        )
        .await
    }

    /// Exchange a refresh token for new tokens.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let endpoints = self.endpoints().await?;
        token::refresh_token(
            &self.http,
            &endpoints.token_endpoint,
            &self.config.client_id,
            refresh_token,
        )
        .await
    }
}

fn build_http_client() -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}
