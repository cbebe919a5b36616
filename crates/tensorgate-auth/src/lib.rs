//! Security core for the tensorgate gateway.
//!
//! Everything here is stateless: session proof lives in a client-held,
//! tamper-evident token, and the anti-forgery state blob is carried through
//! the identity provider rather than stored server-side.
//!
//! # Components
//!
//! - [`signer`] — HMAC-SHA256 tags over session claims, constant-time verify
//! - [`session`] — `username:expiresAt:tag` token issue/verify
//! - [`state`] — opaque login-state blob (return URL, nonce, issuance time)
//! - [`allowlist`] — static set of permitted usernames
//! - [`github`] — authorize URL, code exchange, identity fetch

mod clock;

pub mod allowlist;
pub mod error;
pub mod github;
pub mod session;
pub mod signer;
pub mod state;

pub use allowlist::Allowlist;
pub use error::{AuthError, Result};
pub use github::{GitHubClient, OAuthConfig};
pub use session::SessionCodec;
pub use signer::Signer;
pub use state::{LoginState, STATE_MAX_AGE_SECS};
