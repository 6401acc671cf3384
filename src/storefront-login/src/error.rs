//! Error types for storefront-login.

use thiserror::Error;

/// Which discovery document a [`AuthError::Discovery`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryKind {
    /// OAuth / OpenID endpoint discovery.
    OpenId,
    /// Customer API endpoint discovery.
    CustomerApi,
}

impl std::fmt::Display for DiscoveryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryKind::OpenId => write!(f, "OpenID configuration"),
            DiscoveryKind::CustomerApi => write!(f, "customer API"),
        }
    }
}

/// Authentication error types.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Resolving provider or API endpoints failed.
    #[error("{kind} discovery failed at {url}: {reason}")]
    Discovery {
        kind: DiscoveryKind,
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// The token endpoint rejected an authorization code.
    #[error("token exchange failed ({}): {body}", fmt_status(.status))]
    TokenExchange { status: Option<u16>, body: String },

    /// The token endpoint rejected a refresh token.
    #[error("token refresh failed ({}): {body}", fmt_status(.status))]
    TokenRefresh { status: Option<u16>, body: String },

    /// The identity token is not three base64url JSON segments.
    #[error("malformed identity token: {0}")]
    MalformedToken(String),

    /// Callback state does not match the stored state (CSRF).
    #[error("state parameter mismatch")]
    StateMismatch,

    /// Identity token nonce does not match the stored nonce (replay).
    #[error("nonce mismatch")]
    NonceMismatch,

    /// The session lost the PKCE verifier of the in-flight attempt.
    #[error("code verifier missing from session")]
    MissingVerifier,

    /// Required client or shop settings are absent or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The callback did not carry both `code` and `state`.
    #[error("invalid callback: missing {0}")]
    InvalidCallback(&'static str),

    /// The identity provider reported an error on the callback.
    #[error("identity provider error: {error} - {description}")]
    ProviderError { error: String, description: String },

    /// No usable access token is available.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The customer API rejected an authenticated request.
    #[error("customer API request failed ({status}): {body}")]
    ApiRequest { status: u16, body: String },

    /// The secure random source failed.
    #[error("secure random source failed: {0}")]
    Random(String),

    /// The session collaborator failed to commit.
    #[error("session error: {0}")]
    Session(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {code}"),
        None => "no response".to_string(),
    }
}

impl AuthError {
    /// Stable code shown on the login page so the UI can render a
    /// cause-specific message.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Discovery { .. } => "discovery_failed",
            AuthError::TokenExchange { .. } => "token_exchange_failed",
            AuthError::TokenRefresh { .. } => "refresh_failed",
            AuthError::MalformedToken(_) => "invalid_id_token",
            AuthError::StateMismatch => "invalid_state",
            AuthError::NonceMismatch => "invalid_nonce",
            AuthError::MissingVerifier => "missing_verifier",
            AuthError::Configuration(_) => "configuration_error",
            AuthError::InvalidCallback(_) => "invalid_callback",
            AuthError::ProviderError { .. } => "provider_error",
            AuthError::NotAuthenticated => "not_authenticated",
            AuthError::ApiRequest { .. } => "api_request_failed",
            AuthError::Random(_)
            | AuthError::Session(_)
            | AuthError::Http(_)
            | AuthError::Json(_)
            | AuthError::Url(_) => "internal_error",
        }
    }

    /// Location of the login page carrying this error's code.
    pub fn login_redirect(&self, login_path: &str) -> String {
        login_redirect_with_code(login_path, self.error_code())
    }
}

/// Append `error=<code>` to the login path.
pub fn login_redirect_with_code(login_path: &str, code: &str) -> String {
    let separator = if login_path.contains('?') { '&' } else { '?' };
    format!("{login_path}{separator}error={code}")
}

/// Result type for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_error_codes_are_distinct_per_cause() {
        let errors = [
            AuthError::Discovery {
                kind: DiscoveryKind::OpenId,
                url: "u".into(),
                status: Some(404),
                reason: "r".into(),
            },
            AuthError::TokenExchange {
                status: Some(400),
                body: String::new(),
            },
            AuthError::TokenRefresh {
                status: Some(400),
                body: String::new(),
            },
            AuthError::MalformedToken("x".into()),
            AuthError::StateMismatch,
            AuthError::NonceMismatch,
            AuthError::MissingVerifier,
            AuthError::Configuration("x".into()),
            AuthError::InvalidCallback("state"),
            AuthError::ProviderError {
                error: "access_denied".into(),
                description: String::new(),
            },
            AuthError::NotAuthenticated,
            AuthError::ApiRequest {
                status: 500,
                body: String::new(),
            },
        ];
        let codes: HashSet<_> = errors.iter().map(AuthError::error_code).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_discovery_message_names_the_document() {
        let openid = AuthError::Discovery {
            kind: DiscoveryKind::OpenId,
            url: "https://shop.example/.well-known/openid-configuration".into(),
            status: Some(503),
            reason: "HTTP 503 Service Unavailable".into(),
        };
        let api = AuthError::Discovery {
            kind: DiscoveryKind::CustomerApi,
            url: "https://shop.example/.well-known/customer-account-api".into(),
            status: Some(503),
            reason: "HTTP 503 Service Unavailable".into(),
        };
        assert!(openid.to_string().starts_with("OpenID configuration"));
        assert!(api.to_string().starts_with("customer API"));
        assert!(openid.to_string().contains("503"));
    }

    #[test]
    fn test_token_error_display_includes_status_and_body() {
        let err = AuthError::TokenExchange {
            status: Some(400),
            body: "invalid_grant".into(),
        };
        assert_eq!(
            err.to_string(),
            "token exchange failed (HTTP 400): invalid_grant"
        );
        let err = AuthError::TokenRefresh {
            status: None,
            body: "connection refused".into(),
        };
        assert!(err.to_string().contains("no response"));
    }

    #[test]
    fn test_login_redirect() {
        assert_eq!(
            AuthError::StateMismatch.login_redirect("/account/login"),
            "/account/login?error=invalid_state"
        );
        assert_eq!(
            AuthError::NonceMismatch.login_redirect("/login?return=/orders"),
            "/login?return=/orders&error=invalid_nonce"
        );
    }
}
