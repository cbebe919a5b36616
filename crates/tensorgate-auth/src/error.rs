//! Error taxonomy for the auth core.
//!
//! Messages are surfaced to browsers on the login page or as JSON bodies,
//! so they must never contain the signing secret, the upstream credential,
//! or a raw provider access token.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while authenticating a user.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// OAuth is not configured (missing client credentials).
    #[error("GitHub OAuth not configured")]
    Config,

    /// Malformed state, missing authorization code, or a provider-reported
    /// OAuth error.
    #[error("{0}")]
    Protocol(String),

    /// The identity was verified but is not on the allowlist.
    #[error("User not authorized")]
    Authorization,

    /// Malformed, expired, or tampered session token.
    #[error("Invalid session: {0}")]
    Token(String),

    /// The identity provider or backend API could not be reached, or
    /// returned a non-success status.
    #[error("Upstream error: {0}")]
    Upstream(String),
}
