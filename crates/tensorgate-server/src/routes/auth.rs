//! OAuth login flow and session endpoints.
//!
//! The flow is `login → github → callback`, with every failure surfaced as a
//! redirect back to the login page carrying a human-readable `error` query
//! parameter — misconfiguration included, never a crash.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use tensorgate_auth::state as login_state;

use crate::config::GatewayConfig;
use crate::state::AppState;

const LOGIN_PAGE: &str = include_str!("login.html");

// ─────────────────────────────────────────────────────────────────────────────
// Query parameters
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub return_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GithubQuery {
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    pub return_url: Option<String>,
}

/// Body of `/auth/verify` responses.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /auth/login` — render the login page.
///
/// The sign-in link embeds a freshly encoded state blob carrying the
/// post-login redirect target.
pub async fn login(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Html<String> {
    let return_url = query
        .return_url
        .unwrap_or_else(|| state.config().default_origin.clone());
    let blob = login_state::encode(&return_url);
    let auth_url = format!("/auth/github?state={}", urlencoding::encode(&blob));

    let error_html = query
        .error
        .map(|e| format!(r#"<div class="error">{}</div>"#, escape_html(&e)))
        .unwrap_or_default();

    Html(
        LOGIN_PAGE
            .replacen("{{AUTH_URL}}", &auth_url, 1)
            .replacen("{{ERROR}}", &error_html, 1),
    )
}

/// `GET /auth/github` — redirect to the provider authorize URL.
///
/// A missing client id is a recoverable configuration error, surfaced back
/// through the login page.
pub async fn github(State(state): State<AppState>, Query(query): Query<GithubQuery>) -> Redirect {
    let blob = query
        .state
        .unwrap_or_else(|| login_state::encode(&state.config().default_origin));

    let Some(oauth) = state.oauth() else {
        tracing::warn!("login attempted without GitHub OAuth credentials configured");
        return login_redirect("GitHub OAuth not configured", None);
    };

    let redirect_uri = format!(
        "{}/auth/callback",
        state.config().public_url.trim_end_matches('/')
    );
    Redirect::to(&oauth.authorize_url(&redirect_uri, &blob))
}

/// Result of a callback exchange, before it is rendered as a redirect.
enum CallbackOutcome {
    Established { username: String, return_url: String },
    Rejected { error: String, return_url: String },
}

async fn run_callback(state: &AppState, query: CallbackQuery) -> CallbackOutcome {
    // The return URL survives even when the rest of the callback fails, as
    // long as the state blob itself is parseable.
    let return_url = query
        .state
        .as_deref()
        .and_then(|s| login_state::decode(s).ok())
        .map(|s| s.return_url)
        .unwrap_or_else(|| state.config().default_origin.clone());

    let rejected = |error: String| CallbackOutcome::Rejected {
        error,
        return_url: return_url.clone(),
    };

    let Some(code) = query.code.as_deref() else {
        return rejected("No authorization code".to_string());
    };
    let Some(oauth) = state.oauth() else {
        return rejected("GitHub OAuth not configured".to_string());
    };

    let access_token = match oauth.exchange_code(code).await {
        Ok(token) => token,
        Err(e) => return rejected(e.to_string()),
    };

    let username = match oauth.fetch_username(&access_token).await {
        Ok(username) => username,
        Err(e) => return rejected(e.to_string()),
    };

    if !state.config().allowed_users.permits(&username) {
        tracing::warn!(username = %username, "identity verified but not on allowlist");
        return rejected("User not authorized".to_string());
    }

    CallbackOutcome::Established {
        username,
        return_url,
    }
}

/// `GET /auth/callback` — complete the authorization-code exchange.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Response {
    match run_callback(&state, query).await {
        CallbackOutcome::Established {
            username,
            return_url,
        } => {
            let config = state.config();
            let token = state.sessions().issue(&username, config.session_ttl_secs);
            tracing::info!(username = %username, "session established");
            (
                jar.add(session_cookie(config, &token)),
                Redirect::to(&return_url),
            )
                .into_response()
        }
        CallbackOutcome::Rejected { error, return_url } => {
            tracing::warn!(error = %error, "login rejected");
            login_redirect(&error, Some(&return_url)).into_response()
        }
    }
}

/// `GET /auth/verify` — report whether the caller holds a valid session.
///
/// An explicit `token` query parameter takes precedence over the cookie;
/// that path exists for compatibility with older frontends, and new callers
/// should rely on the cookie alone.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
    jar: CookieJar,
) -> Response {
    let token = query.token.or_else(|| {
        jar.get(state.config().cookie_name.as_str())
            .and_then(|c| urlencoding::decode(c.value()).ok())
            .map(|v| v.into_owned())
    });

    match token.and_then(|t| state.sessions().verify(&t).ok()) {
        Some(username) => Json(VerifyResponse {
            valid: true,
            username: Some(username),
        })
        .into_response(),
        None => (
            axum::http::StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                valid: false,
                username: None,
            }),
        )
            .into_response(),
    }
}

/// `GET /auth/logout` — clear the session cookie and redirect.
pub async fn logout(
    State(state): State<AppState>,
    Query(query): Query<LogoutQuery>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    let return_url = query
        .return_url
        .unwrap_or_else(|| state.config().default_origin.clone());
    (
        jar.add(clear_session_cookie(state.config())),
        Redirect::to(&return_url),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Verify the session cookie in a request's headers and return the username.
pub(crate) fn session_username(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    let cookie = jar.get(state.config().cookie_name.as_str())?;
    let token = urlencoding::decode(cookie.value()).ok()?;
    state.sessions().verify(&token).ok()
}

fn session_cookie(config: &GatewayConfig, token: &str) -> Cookie<'static> {
    Cookie::build((
        config.cookie_name.clone(),
        urlencoding::encode(token).into_owned(),
    ))
    .path("/")
    .domain(config.cookie_domain())
    .max_age(time::Duration::seconds(config.session_ttl_secs as i64))
    .http_only(true)
    .secure(true)
    .same_site(SameSite::Lax)
    .build()
}

fn clear_session_cookie(config: &GatewayConfig) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), String::new()))
        .path("/")
        .domain(config.cookie_domain())
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

fn login_redirect(error: &str, return_url: Option<&str>) -> Redirect {
    let mut target = format!("/auth/login?error={}", urlencoding::encode(error));
    if let Some(url) = return_url {
        target.push_str(&format!("&return_url={}", urlencoding::encode(url)));
    }
    Redirect::to(&target)
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
