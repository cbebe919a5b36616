//! Session token issuing and verification.
//!
//! A token is the triple `username:expiresAt:tag` where `tag` is the HMAC of
//! `username:expiresAt`. The client holds the only copy (as a cookie); the
//! gateway never stores it. Usernames must not contain `:` — GitHub logins
//! cannot, and a token minted with one would never verify.

use crate::clock::now_unix;
use crate::error::{AuthError, Result};
use crate::signer::Signer;

/// Builds and parses signed session tokens.
#[derive(Debug, Clone)]
pub struct SessionCodec {
    signer: Signer,
}

impl SessionCodec {
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    /// Issue a token for `username` expiring `ttl_secs` from now.
    pub fn issue(&self, username: &str, ttl_secs: u64) -> String {
        self.issue_at(username, ttl_secs, now_unix())
    }

    fn issue_at(&self, username: &str, ttl_secs: u64, now: u64) -> String {
        let expires = now + ttl_secs;
        let message = format!("{username}:{expires}");
        let tag = self.signer.sign(message.as_bytes());
        format!("{message}:{tag}")
    }

    /// Verify a token and return the embedded username.
    ///
    /// Fails closed on malformed structure, a garbled expiry, an elapsed
    /// expiry, and any tag mismatch. Every failure is [`AuthError::Token`].
    pub fn verify(&self, token: &str) -> Result<String> {
        self.verify_at(token, now_unix())
    }

    fn verify_at(&self, token: &str, now: u64) -> Result<String> {
        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() != 3 {
            return Err(AuthError::Token("malformed token".into()));
        }
        let (username, expires_str, tag) = (parts[0], parts[1], parts[2]);

        if username.is_empty() {
            return Err(AuthError::Token("empty username".into()));
        }

        let expires: u64 = expires_str
            .parse()
            .map_err(|_| AuthError::Token("non-numeric expiry".into()))?;
        if now > expires {
            return Err(AuthError::Token("expired".into()));
        }

        let message = format!("{username}:{expires_str}");
        if !self.signer.verify(message.as_bytes(), tag) {
            return Err(AuthError::Token("signature mismatch".into()));
        }

        Ok(username.to_string())
    }
}
