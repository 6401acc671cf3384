//! Login, callback and logout flows consumed by route handlers.
//!
//! Callback handling runs strictly in order: callback parameters, state,
//! verifier, code exchange, nonce, persistence. Each failure is a distinct
//! [`AuthError`] whose [`AuthError::error_code`] the login page can show.

use serde::Deserialize;
use url::Url;

use crate::auth_url::{AuthorizationUrlParams, build_authorization_url, build_logout_url};
use crate::client::AuthClient;
use crate::error::{AuthError, Result};
use crate::id_token::{DecodedToken, decode_id_token};
use crate::pkce::AuthorizationRequest;
use crate::session::Session;
use crate::store::{FlowArtifacts, TokenSet, TokenStore, now_millis};

/// Per-request options for starting a login.
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Overrides the configured locale.
    pub locale: Option<String>,
    /// Request silent authentication (`prompt=none`).
    pub silent: bool,
}

/// Query parameters the identity provider sends to the callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse from a raw query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }

    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or(""))
    }
}

/// Result of a successful callback.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    /// Unverified identity token claims, when an identity token was issued.
    pub id_token: Option<DecodedToken>,
}

/// Start an authorization attempt.
///
/// Generates PKCE, state and nonce, stores them in the session and returns
/// the URL to redirect the browser to. Nothing is stored if the URL cannot
/// be built.
pub async fn initiate_login<S: Session + ?Sized>(
    client: &AuthClient,
    session: &mut S,
    options: &LoginOptions,
) -> Result<Url> {
    let request = AuthorizationRequest::generate()?;
    let endpoints = client.endpoints().await?;
    let config = client.config();

    let url = build_authorization_url(&AuthorizationUrlParams {
        authorization_endpoint: &endpoints.authorization_endpoint,
        client_id: &config.client_id,
        redirect_uri: &config.redirect_uri,
        state: &request.security.state,
        code_challenge: &request.pkce.challenge,
        nonce: Some(&request.security.nonce),
        locale: options.locale.as_deref().or(config.locale.as_deref()),
        silent: options.silent,
    })?;

    TokenStore::new(session).save_flow(&request);
    tracing::debug!(silent = options.silent, "Started authorization attempt");
    Ok(url)
}

/// Complete an authorization attempt from the provider's callback.
///
/// On success the tokens are persisted. Any failure once `code` and `state`
/// are present erases the in-flight artifacts and persists nothing. A
/// callback missing `code` or `state` leaves the session untouched.
///
/// A provider error only erases the artifacts when it echoes the stored
/// `state`. An error echoing some other state is a [`AuthError::StateMismatch`],
/// and one without a state leaves the attempt in place.
pub async fn handle_callback<S: Session + ?Sized>(
    client: &AuthClient,
    session: &mut S,
    params: &CallbackParams,
) -> Result<LoginSuccess> {
    let mut store = TokenStore::new(session);

    if let Some(error) = &params.error {
        tracing::warn!(error = %error, "Identity provider returned an error");
        if let Some(received_state) = non_empty(&params.state) {
            let flow = store.flow();
            let expected = flow.state.as_deref().unwrap_or("");
            if !constant_time_eq(expected, received_state) {
                return Err(AuthError::StateMismatch);
            }
            store.clear_flow();
        }
        return Err(AuthError::ProviderError {
            error: error.clone(),
            description: params.error_description.clone().unwrap_or_default(),
        });
    }

    let code = non_empty(&params.code).ok_or(AuthError::InvalidCallback("code"))?;
    let received_state = non_empty(&params.state).ok_or(AuthError::InvalidCallback("state"))?;

    let flow = store.flow();
    store.clear_flow();

    let result = exchange_and_validate(client, &flow, code, received_state).await;

    match result {
        Ok((tokens, id_token)) => {
            store.save(&tokens);
            tracing::info!(expires_at = tokens.expires_at, "Customer login successful");
            Ok(LoginSuccess { id_token })
        }
        Err(e) => {
            tracing::warn!(error = %e, code = e.error_code(), "Login callback failed");
            Err(e)
        }
    }
}

async fn exchange_and_validate(
    client: &AuthClient,
    flow: &FlowArtifacts,
    code: &str,
    received_state: &str,
) -> Result<(TokenSet, Option<DecodedToken>)> {
    let expected_state = flow.state.as_deref().ok_or(AuthError::StateMismatch)?;
    if !constant_time_eq(expected_state, received_state) {
        return Err(AuthError::StateMismatch);
    }
    tracing::debug!("OAuth state validation passed");

    let verifier = flow
        .code_verifier
        .as_deref()
        .ok_or(AuthError::MissingVerifier)?;

    let response = client.exchange_code(code, verifier).await?;
    let issued_at = now_millis();

    let decoded = match &flow.nonce {
        Some(expected_nonce) => {
            let id_token = response.id_token.as_deref().ok_or_else(|| {
                AuthError::MalformedToken("no identity token in token response".into())
            })?;
            let decoded = decode_id_token(id_token)?;
            if !constant_time_eq(expected_nonce, decoded.nonce().unwrap_or("")) {
                return Err(AuthError::NonceMismatch);
            }
            tracing::debug!("Identity token nonce validation passed");
            Some(decoded)
        }
        None => response
            .id_token
            .as_deref()
            .and_then(|t| decode_id_token(t).ok()),
    };

    Ok((TokenSet::issued(response, issued_at), decoded))
}

/// Log the customer out.
///
/// Clears the session, then returns the provider's end-session URL when an
/// identity token and an end-session endpoint are available. Endpoint
/// resolution failures are logged and yield `None`: the local session is
/// already gone.
pub async fn logout<S: Session + ?Sized>(
    client: &AuthClient,
    session: &mut S,
) -> Result<Option<Url>> {
    let mut store = TokenStore::new(session);
    let id_token = store.id_token();
    store.clear();
    tracing::info!("Customer logged out");

    let Some(id_token) = id_token else {
        return Ok(None);
    };

    let endpoints = match client.endpoints().await {
        Ok(endpoints) => endpoints,
        Err(e) => {
            tracing::warn!(error = %e, "Could not resolve end-session endpoint");
            return Ok(None);
        }
    };
    let Some(end_session) = endpoints.end_session_endpoint else {
        return Ok(None);
    };

    build_logout_url(
        &end_session,
        &id_token,
        client.config().post_logout_redirect_uri.as_deref(),
    )
    .map(Some)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
