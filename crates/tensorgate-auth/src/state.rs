//! Anti-forgery state blob round-tripped through the identity provider.
//!
//! The blob carries the post-login redirect target, a random nonce, and its
//! issuance time, encoded as URL-safe base64 JSON. The provider passes it
//! through unmodified. The nonce makes the blob unguessable; it is not
//! checked against any server-side record (the gateway keeps no state), so
//! this is freshness protection, not replay protection.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::now_unix;
use crate::error::{AuthError, Result};

/// How long a state blob stays valid (10 minutes).
pub const STATE_MAX_AGE_SECS: u64 = 600;

/// Decoded contents of a state blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginState {
    pub return_url: String,
    pub nonce: String,
    pub issued_at: u64,
}

/// Encode a fresh state blob carrying `return_url`.
pub fn encode(return_url: &str) -> String {
    encode_at(return_url, now_unix())
}

fn encode_at(return_url: &str, now: u64) -> String {
    let state = LoginState {
        return_url: return_url.to_string(),
        nonce: Uuid::new_v4().to_string(),
        issued_at: now,
    };
    // A struct of strings and an integer always serializes.
    let json = serde_json::to_vec(&state).expect("state serializes");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a state blob, rejecting malformed input and anything older than
/// [`STATE_MAX_AGE_SECS`].
pub fn decode(raw: &str) -> Result<LoginState> {
    decode_at(raw, now_unix())
}

fn decode_at(raw: &str, now: u64) -> Result<LoginState> {
    let bytes = URL_SAFE_NO_PAD
        .decode(raw)
        .map_err(|_| AuthError::Protocol("Malformed state parameter".into()))?;
    let state: LoginState = serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::Protocol("Malformed state parameter".into()))?;

    if now.saturating_sub(state.issued_at) > STATE_MAX_AGE_SECS {
        return Err(AuthError::Protocol("Login attempt expired".into()));
    }

    Ok(state)
}
