//! GitHub OAuth client: authorize URL, code exchange, identity fetch.
//!
//! Only the fields the gateway consumes are deserialized (`access_token`,
//! `error`, `error_description`, `login`); anything else the provider sends
//! is ignored, and a missing field fails closed.

use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

use crate::error::{AuthError, Result};

const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";

/// OAuth endpoints and client credentials.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub user_url: String,
    pub scope: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("user_url", &self.user_url)
            .field("scope", &self.scope)
            .finish()
    }
}

impl OAuthConfig {
    /// Config for GitHub with a minimal read-only scope.
    pub fn github(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authorize_url: GITHUB_AUTHORIZE_URL.to_string(),
            token_url: GITHUB_TOKEN_URL.to_string(),
            user_url: GITHUB_USER_URL.to_string(),
            scope: "read:user".to_string(),
        }
    }

    /// Point the token and user endpoints at a different base URL.
    /// Used to target a stand-in provider in tests.
    pub fn with_provider_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.authorize_url = format!("{base}/login/oauth/authorize");
        self.token_url = format!("{base}/login/oauth/access_token");
        self.user_url = format!("{base}/user");
        self
    }
}

/// Wire schema of the token exchange response.
#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Wire schema of the user identity response.
#[derive(Debug, Deserialize)]
struct UserResponse {
    login: Option<String>,
}

/// Client for the three-legged GitHub OAuth exchange.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl GitHubClient {
    pub fn new(config: OAuthConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the provider authorize URL for a login attempt.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> String {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", self.config.scope.as_str()),
            ("state", state),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.config.authorize_url, query)
    }

    /// Exchange an authorization code for an access token.
    ///
    /// A provider-reported error aborts with the provider's own message; a
    /// response without an `access_token` is treated the same way.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.config.token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("token exchange failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Upstream(format!(
                "token endpoint returned {status}"
            )));
        }

        let body: AccessTokenResponse = response
            .json()
            .await
            .map_err(|_| AuthError::Protocol("Unexpected token response".into()))?;

        if let Some(error) = body.error {
            tracing::warn!(%error, "provider rejected code exchange");
            return Err(AuthError::Protocol(
                body.error_description.unwrap_or(error),
            ));
        }

        body.access_token
            .ok_or_else(|| AuthError::Protocol("No access token in response".into()))
    }

    /// Fetch the authenticated username.
    ///
    /// Absence of a username is a failure, not an anonymous session.
    pub async fn fetch_username(&self, access_token: &str) -> Result<String> {
        let response = self
            .http
            .get(&self.config.user_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "tensorgate")
            .send()
            .await
            .map_err(|e| AuthError::Upstream(format!("identity fetch failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Upstream(format!(
                "identity endpoint returned {status}"
            )));
        }

        let body: UserResponse = response
            .json()
            .await
            .map_err(|_| AuthError::Protocol("Unexpected identity response".into()))?;

        body.login
            .ok_or_else(|| AuthError::Protocol("Could not get GitHub username".into()))
    }
}
