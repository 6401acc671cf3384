//! Route guards built on the token store.

use crate::client::AuthClient;
use crate::error::login_redirect_with_code;
use crate::session::Session;
use crate::store::{TokenAccess, TokenStore, is_authenticated};

/// Abort the current request and send the browser elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }
}

/// Require a logged-in customer.
///
/// Returns a valid access token, refreshing it if needed. Otherwise
/// redirects to the login route; when a refresh was attempted and failed
/// the redirect carries the `refresh_failed` code.
pub async fn require_auth<S: Session + ?Sized>(
    client: &AuthClient,
    session: &mut S,
) -> Result<String, Redirect> {
    let login_path = &client.config().login_path;

    match TokenStore::new(session).access_token(client).await {
        TokenAccess::Valid(token) | TokenAccess::Refreshed(token) => Ok(token),
        TokenAccess::RefreshFailed => Err(Redirect::to(login_redirect_with_code(
            login_path,
            "refresh_failed",
        ))),
        TokenAccess::Missing => {
            tracing::debug!("No customer session, redirecting to login");
            Err(Redirect::to(login_path.clone()))
        }
    }
}

/// Use the customer's access token when there is one.
///
/// Never aborts: any failure yields `None` and the caller renders the
/// logged-out experience.
pub async fn optional_auth<S: Session + ?Sized>(
    client: &AuthClient,
    session: &mut S,
) -> Option<String> {
    TokenStore::new(session).valid_access_token(client).await
}

/// Like [`optional_auth`] for hosts whose client may be unconfigured.
pub async fn optional_auth_with<S: Session + ?Sized>(
    client: Option<&AuthClient>,
    session: &mut S,
) -> Option<String> {
    match client {
        Some(client) => optional_auth(client, session).await,
        None => {
            tracing::debug!("Customer login is not configured");
            None
        }
    }
}

/// Keep logged-in customers away from login-style pages.
///
/// Side-effect free: an expired token set is not refreshed here.
pub fn redirect_if_authenticated<S: Session + ?Sized>(
    session: &S,
    destination: &str,
) -> Result<(), Redirect> {
    if is_authenticated(session) {
        return Err(Redirect::to(destination));
    }
    Ok(())
}
