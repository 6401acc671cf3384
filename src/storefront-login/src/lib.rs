//! Storefront Login - customer authentication for storefronts.
//!
//! Authenticates customers against the shop's identity provider with the
//! OAuth 2.0 authorization code flow and PKCE, then manages the access,
//! refresh and identity tokens in the host's session:
//! - Endpoint discovery (or direct construction from a shop id)
//! - PKCE, state and nonce generation
//! - Code exchange and lazy token refresh
//! - Route guards and authenticated customer API requests
//!
//! Every operation takes the session explicitly; nothing is ambient.

// Core modules
pub mod config;
pub mod constants;
pub mod error;
pub mod session;

// Protocol building blocks
pub mod auth_url;
pub mod discovery;
pub mod id_token;
pub mod pkce;
pub mod token;

// High-level APIs
pub mod api;
mod client;
pub mod flow;
pub mod guards;
pub mod store;

// Re-exports from config and error
pub use config::AuthConfig;
pub use error::{AuthError, DiscoveryKind, Result};

// Re-exports from client
pub use client::AuthClient;

// Re-exports from session and store
pub use session::{MemorySession, Session, SessionKey};
pub use store::{TokenAccess, TokenSet, TokenState, TokenStore, is_authenticated};

// Re-exports from flows
pub use flow::{CallbackParams, LoginOptions, LoginSuccess, handle_callback, initiate_login, logout};
pub use guards::{
    Redirect, optional_auth, optional_auth_with, redirect_if_authenticated, require_auth,
};

// Re-exports from api
pub use api::{GraphqlRequest, customer_api_request};

// Re-exports from building blocks
pub use discovery::{AuthEndpoints, CustomerApiConfig, OpenIdConfiguration};
pub use id_token::{DecodedToken, decode_id_token, get_nonce};
pub use pkce::{AuthorizationRequest, PkceChallenge, SecurityParams};
