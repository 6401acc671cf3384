//! Session-backed token storage and lazy refresh.

use secrecy::{ExposeSecret, SecretString};

use crate::client::AuthClient;
use crate::pkce::AuthorizationRequest;
use crate::session::{Session, SessionKey};
use crate::token::{RefreshResponse, TokenResponse};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn expiry_from(now_ms: i64, expires_in_secs: u64) -> i64 {
    let ttl_ms = i64::try_from(expires_in_secs)
        .unwrap_or(i64::MAX)
        .saturating_mul(1000);
    now_ms.saturating_add(ttl_ms)
}

/// Logical authentication state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Unauthenticated,
    Authenticated,
    Expired,
}

/// Tokens issued for the current customer.
pub struct TokenSet {
    access_token: SecretString,
    refresh_token: SecretString,
    id_token: Option<SecretString>,
    /// Absolute expiry, epoch milliseconds.
    pub expires_at: i64,
}

impl TokenSet {
    pub fn new(
        access_token: String,
        refresh_token: String,
        id_token: Option<String>,
        expires_at: i64,
    ) -> Self {
        Self {
            access_token: SecretString::from(access_token),
            refresh_token: SecretString::from(refresh_token),
            id_token: id_token.map(SecretString::from),
            expires_at,
        }
    }

    /// Tokens from a code exchange answered at `now_ms`.
    pub fn issued(response: TokenResponse, now_ms: i64) -> Self {
        Self::new(
            response.access_token,
            response.refresh_token,
            response.id_token,
            expiry_from(now_ms, response.expires_in),
        )
    }

    /// Apply a refresh answered at `now_ms`. The identity token is kept.
    pub fn refreshed(self, response: RefreshResponse, now_ms: i64) -> Self {
        Self {
            access_token: SecretString::from(response.access_token),
            refresh_token: SecretString::from(response.refresh_token),
            id_token: self.id_token,
            expires_at: expiry_from(now_ms, response.expires_in),
        }
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }

    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_ref().map(|t| t.expose_secret())
    }

    /// Expired at `now_ms`; the boundary instant counts as expired.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }

    pub fn time_until_expiry_ms(&self, now_ms: i64) -> i64 {
        self.expires_at - now_ms
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("has_id_token", &self.id_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Stored artifacts of the in-flight authorization attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowArtifacts {
    pub code_verifier: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
}

/// Read the token set stored in `session`.
pub fn load_tokens<S: Session + ?Sized>(session: &S) -> Option<TokenSet> {
    let access_token = session.get(SessionKey::AccessToken)?;
    let refresh_token = session.get(SessionKey::RefreshToken)?;
    let raw_expiry = session.get(SessionKey::ExpiresAt)?;

    let expires_at = match raw_expiry.trim().parse::<i64>() {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Stored token expiry is corrupt, treating as logged out");
            return None;
        }
    };
    if access_token.is_empty() || refresh_token.is_empty() {
        tracing::debug!("Stored token set is incomplete, treating as logged out");
        return None;
    }

    Some(TokenSet::new(
        access_token,
        refresh_token,
        session.get(SessionKey::IdToken),
        expires_at,
    ))
}

pub fn token_state_at<S: Session + ?Sized>(session: &S, now_ms: i64) -> TokenState {
    match load_tokens(session) {
        None => TokenState::Unauthenticated,
        Some(tokens) if tokens.is_expired_at(now_ms) => TokenState::Expired,
        Some(_) => TokenState::Authenticated,
    }
}

/// True iff `session` holds an unexpired token set. Only reads.
pub fn is_authenticated<S: Session + ?Sized>(session: &S) -> bool {
    token_state_at(session, now_millis()) == TokenState::Authenticated
}

/// Outcome of asking the store for an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAccess {
    /// The stored token was still valid.
    Valid(String),
    /// The stored token had expired and was refreshed.
    Refreshed(String),
    /// No token set is stored.
    Missing,
    /// The stored token had expired and the refresh failed. The session
    /// has been cleared.
    RefreshFailed,
}

impl TokenAccess {
    pub fn into_token(self) -> Option<String> {
        match self {
            TokenAccess::Valid(token) | TokenAccess::Refreshed(token) => Some(token),
            TokenAccess::Missing | TokenAccess::RefreshFailed => None,
        }
    }
}

/// Token operations over a borrowed session.
pub struct TokenStore<'s, S: Session + ?Sized> {
    session: &'s mut S,
}

impl<'s, S: Session + ?Sized> TokenStore<'s, S> {
    pub fn new(session: &'s mut S) -> Self {
        Self { session }
    }

    /// Read the stored token set. Missing or unparseable entries read as
    /// no token set at all.
    pub fn load(&self) -> Option<TokenSet> {
        load_tokens(&*self.session)
    }

    pub fn state_at(&self, now_ms: i64) -> TokenState {
        token_state_at(&*self.session, now_ms)
    }

    pub fn state(&self) -> TokenState {
        self.state_at(now_millis())
    }

    /// True iff a token set is present and unexpired. Never refreshes.
    pub fn is_authenticated(&self) -> bool {
        is_authenticated(&*self.session)
    }

    pub fn id_token(&self) -> Option<String> {
        self.session.get(SessionKey::IdToken)
    }

    /// Persist a token set, replacing any previous one.
    pub fn save(&mut self, tokens: &TokenSet) {
        self.session
            .set(SessionKey::AccessToken, tokens.access_token().to_string());
        self.session
            .set(SessionKey::RefreshToken, tokens.refresh_token().to_string());
        match tokens.id_token() {
            Some(id_token) => self.session.set(SessionKey::IdToken, id_token.to_string()),
            None => self.session.unset(SessionKey::IdToken),
        }
        self.session
            .set(SessionKey::ExpiresAt, tokens.expires_at.to_string());
    }

    /// Remove the token set and any in-flight authorization artifacts.
    pub fn clear(&mut self) {
        for key in SessionKey::TOKENS.into_iter().chain(SessionKey::FLOW) {
            self.session.unset(key);
        }
    }

    /// Persist the artifacts of a new authorization attempt.
    pub fn save_flow(&mut self, request: &AuthorizationRequest) {
        self.session
            .set(SessionKey::CodeVerifier, request.pkce.verifier.clone());
        self.session
            .set(SessionKey::State, request.security.state.clone());
        self.session
            .set(SessionKey::Nonce, request.security.nonce.clone());
    }

    pub fn flow(&self) -> FlowArtifacts {
        FlowArtifacts {
            code_verifier: self.session.get(SessionKey::CodeVerifier),
            state: self.session.get(SessionKey::State),
            nonce: self.session.get(SessionKey::Nonce),
        }
    }

    pub fn clear_flow(&mut self) {
        for key in SessionKey::FLOW {
            self.session.unset(key);
        }
    }

    /// Return an access token that is valid now, refreshing it if it has
    /// expired.
    ///
    /// Returns `None` when there is no token set, or when the refresh
    /// fails; in the latter case the whole token set is cleared and the
    /// caller should send the customer to login.
    pub async fn valid_access_token(&mut self, client: &AuthClient) -> Option<String> {
        self.access_token(client).await.into_token()
    }

    /// Like [`TokenStore::valid_access_token`], but reports how the token
    /// was obtained. Expiry is judged from a single clock reading.
    pub async fn access_token(&mut self, client: &AuthClient) -> TokenAccess {
        let Some(tokens) = self.load() else {
            return TokenAccess::Missing;
        };
        if !tokens.is_expired_at(now_millis()) {
            return TokenAccess::Valid(tokens.access_token().to_string());
        }

        tracing::debug!(
            expires_at = tokens.expires_at,
            "Access token expired, attempting refresh"
        );
        match client.refresh(tokens.refresh_token()).await {
            Ok(response) => {
                let refreshed = tokens.refreshed(response, now_millis());
                self.save(&refreshed);
                tracing::info!(expires_at = refreshed.expires_at, "Refreshed access token");
                TokenAccess::Refreshed(refreshed.access_token().to_string())
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    code = e.error_code(),
                    "Token refresh failed, clearing session"
                );
                self.clear();
                TokenAccess::RefreshFailed
            }
        }
    }
}
