//! Token endpoint client: authorization-code exchange and refresh.
//!
//! Neither operation retries. Rejections keep the provider's status and
//! response body so callers can diagnose them.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::constants::USER_AGENT;
use crate::error::{AuthError, Result};

/// Token endpoint response to an authorization-code exchange.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    pub expires_in: u64,
}

/// Token endpoint response to a refresh. No identity token is reissued.
#[derive(Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("has_id_token", &self.id_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Parameters of an authorization-code exchange.
#[derive(Clone, Copy)]
pub struct CodeExchange<'a> {
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub code: &'a str,
    pub code_verifier: &'a str,
}

/// A failed token endpoint call, before it is given an error kind.
struct Rejection {
    status: Option<u16>,
    body: String,
}

/// Trade an authorization code and its PKCE verifier for tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    token_endpoint: &str,
    exchange: &CodeExchange<'_>,
) -> Result<TokenResponse> {
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", exchange.client_id),
        ("redirect_uri", exchange.redirect_uri),
        ("code", exchange.code),
        ("code_verifier", exchange.code_verifier),
    ];

    post_form(http, token_endpoint, &form)
        .await
        .map_err(|r| AuthError::TokenExchange {
            status: r.status,
            body: r.body,
        })
}

/// Trade a refresh token for a new access and refresh token.
pub async fn refresh_token(
    http: &reqwest::Client,
    token_endpoint: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<RefreshResponse> {
    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", client_id),
        ("refresh_token", refresh_token),
    ];

    post_form(http, token_endpoint, &form)
        .await
        .map_err(|r| AuthError::TokenRefresh {
            status: r.status,
            body: r.body,
        })
}

async fn post_form<T: DeserializeOwned>(
    http: &reqwest::Client,
    endpoint: &str,
    form: &[(&str, &str)],
) -> std::result::Result<T, Rejection> {
    let grant_type = form
        .iter()
        .find(|(k, _)| *k == "grant_type")
        .map(|(_, v)| *v)
        .unwrap_or_default();

    let response = http
        .post(endpoint)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .header(reqwest::header::ACCEPT, "application/json")
        .form(form)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(grant_type, error = %e, "Token endpoint unreachable");
            Rejection {
                status: None,
                body: e.to_string(),
            }
        })?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        tracing::warn!(grant_type, status = %status, "Token endpoint rejected request");
        return Err(Rejection {
            status: Some(status.as_u16()),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| Rejection {
        status: Some(status.as_u16()),
        body: format!("failed to parse token response: {e}"),
    })
}
