//! PKCE (Proof Key for Code Exchange) and per-attempt security parameters.
//!
//! This implements RFC 7636 with the S256 method only. Every random value
//! comes from the operating system's secure source, directly or through a
//! generator seeded from it. A failing source is an error.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::distr::{Alphanumeric, SampleString};
use rand::rngs::{OsRng, StdRng};
use rand::{SeedableRng, TryRngCore};
use sha2::{Digest, Sha256};

use crate::constants::DEFAULT_NONCE_LENGTH;
use crate::error::{AuthError, Result};

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 32;

/// PKCE challenge method. Plain is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeMethod {
    /// SHA-256 hash of the verifier, base64url encoded.
    S256,
}

impl std::fmt::Display for ChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChallengeMethod::S256 => write!(f, "S256"),
        }
    }
}

/// PKCE code verifier and challenge pair.
#[derive(Clone)]
pub struct PkceChallenge {
    /// The code verifier. Never sent to the identity provider before the
    /// code exchange.
    pub verifier: String,
    /// The code challenge sent on the authorization request.
    pub challenge: String,
    /// Always S256.
    pub method: ChallengeMethod,
}

impl PkceChallenge {
    /// Generate a new verifier from 32 secure random bytes and derive its
    /// S256 challenge.
    pub fn generate() -> Result<Self> {
        let verifier = generate_verifier()?;
        Ok(Self::from_verifier(verifier))
    }

    /// Create a PKCE challenge from an existing verifier.
    pub fn from_verifier(verifier: String) -> Self {
        let challenge = compute_s256_challenge(&verifier);
        Self {
            verifier,
            challenge,
            method: ChallengeMethod::S256,
        }
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"[REDACTED]")
            .field("challenge", &self.challenge)
            .field("method", &self.method)
            .finish()
    }
}

/// Anti-CSRF state and anti-replay nonce for one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityParams {
    pub state: String,
    pub nonce: String,
}

impl SecurityParams {
    /// Generate a fresh state and a nonce of the default length.
    pub fn generate() -> Result<Self> {
        Self::generate_with_nonce_length(DEFAULT_NONCE_LENGTH)
    }

    pub fn generate_with_nonce_length(nonce_len: usize) -> Result<Self> {
        Ok(Self {
            state: generate_state()?,
            nonce: generate_nonce(nonce_len)?,
        })
    }
}

/// Everything one authorization attempt needs. The parts are generated,
/// stored, and consumed together.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub pkce: PkceChallenge,
    pub security: SecurityParams,
}

impl AuthorizationRequest {
    pub fn generate() -> Result<Self> {
        Ok(Self {
            pkce: PkceChallenge::generate()?,
            security: SecurityParams::generate()?,
        })
    }
}

fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| AuthError::Random(e.to_string()))
}

/// Generate a code verifier: 32 random bytes, base64url without padding
/// (43 characters).
fn generate_verifier() -> Result<String> {
    let mut bytes = [0u8; VERIFIER_BYTES];
    fill_random(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// S256: BASE64URL(SHA256(ASCII(code_verifier)))
pub fn compute_s256_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate an anti-CSRF state value carrying 256 bits of entropy.
pub fn generate_state() -> Result<String> {
    let mut bytes = [0u8; STATE_BYTES];
    fill_random(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Generate an alphanumeric nonce of `len` characters.
pub fn generate_nonce(len: usize) -> Result<String> {
    let mut rng = StdRng::try_from_os_rng().map_err(|e| AuthError::Random(e.to_string()))?;
    Ok(Alphanumeric.sample_string(&mut rng, len))
}
