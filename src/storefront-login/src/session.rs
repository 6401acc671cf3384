//! Session collaborator.
//!
//! The host owns the session (usually a signed cookie). The core only sees
//! this key-value interface and never reaches for the session implicitly:
//! every operation that needs it takes it as a parameter.

use std::collections::BTreeMap;

use crate::error::{AuthError, Result};

/// The fixed set of keys the core reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    CodeVerifier,
    State,
    Nonce,
    AccessToken,
    RefreshToken,
    IdToken,
    ExpiresAt,
}

impl SessionKey {
    /// Keys of the in-flight authorization attempt.
    pub const FLOW: [SessionKey; 3] = [
        SessionKey::CodeVerifier,
        SessionKey::State,
        SessionKey::Nonce,
    ];

    /// Keys of the persisted token set.
    pub const TOKENS: [SessionKey; 4] = [
        SessionKey::AccessToken,
        SessionKey::RefreshToken,
        SessionKey::IdToken,
        SessionKey::ExpiresAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::CodeVerifier => "customer_code_verifier",
            SessionKey::State => "customer_state",
            SessionKey::Nonce => "customer_nonce",
            SessionKey::AccessToken => "customer_access_token",
            SessionKey::RefreshToken => "customer_refresh_token",
            SessionKey::IdToken => "customer_id_token",
            SessionKey::ExpiresAt => "customer_expires_at",
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request-scoped key-value session owned by the host.
pub trait Session {
    fn get(&self, key: SessionKey) -> Option<String>;

    fn set(&mut self, key: SessionKey, value: String);

    fn unset(&mut self, key: SessionKey);

    fn has(&self, key: SessionKey) -> bool {
        self.get(key).is_some()
    }

    /// Serialize pending writes into the host's transport artifact
    /// (for example a `Set-Cookie` header value).
    fn commit(&mut self) -> Result<String>;
}

/// In-memory session. `commit` renders the contents as a JSON object.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    values: BTreeMap<String, String>,
    dirty: bool,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a session from a previously committed artifact.
    pub fn from_committed(artifact: &str) -> Result<Self> {
        let values = serde_json::from_str(artifact)
            .map_err(|e| AuthError::Session(format!("corrupt session artifact: {e}")))?;
        Ok(Self {
            values,
            dirty: false,
        })
    }

    /// Whether anything was written since the last commit.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Session for MemorySession {
    fn get(&self, key: SessionKey) -> Option<String> {
        self.values.get(key.as_str()).cloned()
    }

    fn set(&mut self, key: SessionKey, value: String) {
        self.values.insert(key.as_str().to_string(), value);
        self.dirty = true;
    }

    fn unset(&mut self, key: SessionKey) {
        if self.values.remove(key.as_str()).is_some() {
            self.dirty = true;
        }
    }

    fn commit(&mut self) -> Result<String> {
        let artifact = serde_json::to_string(&self.values)?;
        self.dirty = false;
        Ok(artifact)
    }
}
