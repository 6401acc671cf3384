//! Authorization and end-session URL construction.

use url::Url;

use crate::constants::SCOPES;
use crate::error::Result;
use crate::pkce::ChallengeMethod;

/// Inputs for an authorization redirect.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationUrlParams<'a> {
    pub authorization_endpoint: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub state: &'a str,
    pub code_challenge: &'a str,
    pub nonce: Option<&'a str>,
    pub locale: Option<&'a str>,
    /// Ask the provider not to show any UI (`prompt=none`).
    pub silent: bool,
}

/// Build the URL the browser is redirected to for authorization.
pub fn build_authorization_url(params: &AuthorizationUrlParams<'_>) -> Result<Url> {
    let mut url = Url::parse(params.authorization_endpoint)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("scope", SCOPES)
            .append_pair("client_id", params.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", params.redirect_uri)
            .append_pair("state", params.state)
            .append_pair("code_challenge", params.code_challenge)
            .append_pair(
                "code_challenge_method",
                &ChallengeMethod::S256.to_string(),
            );
        if let Some(nonce) = params.nonce {
            query.append_pair("nonce", nonce);
        }
        if let Some(locale) = params.locale {
            query.append_pair("locale", locale);
        }
        if params.silent {
            query.append_pair("prompt", "none");
        }
    }
    Ok(url)
}

/// Build the provider-side end-session URL.
pub fn build_logout_url(
    end_session_endpoint: &str,
    id_token_hint: &str,
    post_logout_redirect_uri: Option<&str>,
) -> Result<Url> {
    let mut url = Url::parse(end_session_endpoint)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("id_token_hint", id_token_hint);
        if let Some(redirect) = post_logout_redirect_uri {
            query.append_pair("post_logout_redirect_uri", redirect);
        }
    }
    Ok(url)
}
