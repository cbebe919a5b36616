//! HMAC-SHA256 signing over session claims.
//!
//! # Security
//!
//! Tag comparison uses constant-time equality to prevent timing attacks.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of a full HMAC-SHA256 tag in hex characters.
pub const FULL_TAG_LEN: usize = 64;

/// Tag length used by the original Worker deployment (128-bit truncation).
pub const COMPAT_TAG_LEN: usize = 32;

/// Computes and verifies message authentication tags with a server secret.
///
/// Signing is total: every byte string gets a tag, and the same input always
/// produces the same tag under the same secret.
#[derive(Clone)]
pub struct Signer {
    secret: Vec<u8>,
    tag_len: usize,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("secret", &"<redacted>")
            .field("tag_len", &self.tag_len)
            .finish()
    }
}

impl Signer {
    /// Create a signer emitting full-length (64 hex char) tags.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            tag_len: FULL_TAG_LEN,
        }
    }

    /// Truncate emitted tags to `len` hex characters.
    ///
    /// This is an explicit opt-in for compatibility with tokens minted by the
    /// original deployment, which truncated tags to [`COMPAT_TAG_LEN`]
    /// (128 bits). New deployments should keep the full-length default.
    pub fn with_tag_length(mut self, len: usize) -> Self {
        self.tag_len = len.clamp(1, FULL_TAG_LEN);
        self
    }

    /// Compute the hex-encoded tag for a message.
    pub fn sign(&self, message: &[u8]) -> String {
        // HMAC-SHA256 accepts keys of any length.
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC key of any length is valid");
        mac.update(message);
        let mut tag = hex::encode(mac.finalize().into_bytes());
        tag.truncate(self.tag_len);
        tag
    }

    /// Check a tag against a message in constant time.
    ///
    /// A one-character difference is rejected identically to a completely
    /// wrong tag; the comparison never early-exits on a partial match.
    pub fn verify(&self, message: &[u8], tag: &str) -> bool {
        let expected = self.sign(message);
        let a = expected.as_bytes();
        let b = tag.as_bytes();

        if a.len() != b.len() {
            // Dummy comparison keeps timing uniform across the length check.
            let _ = a.ct_eq(a);
            return false;
        }

        a.ct_eq(b).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic() {
        let signer = Signer::new("secret");
        assert_eq!(signer.sign(b"alice:12345"), signer.sign(b"alice:12345"));
    }

    #[test]
    fn test_sign_full_length_by_default() {
        let signer = Signer::new("secret");
        assert_eq!(signer.sign(b"message").len(), FULL_TAG_LEN);
    }

    #[test]
    fn test_sign_differs_by_message() {
        let signer = Signer::new("secret");
        assert_ne!(signer.sign(b"alice:12345"), signer.sign(b"bob:12345"));
    }

    #[test]
    fn test_sign_differs_by_secret() {
        let a = Signer::new("secret-a");
        let b = Signer::new("secret-b");
        assert_ne!(a.sign(b"alice:12345"), b.sign(b"alice:12345"));
    }

    #[test]
    fn test_verify_accepts_own_tag() {
        let signer = Signer::new("secret");
        let tag = signer.sign(b"alice:12345");
        assert!(signer.verify(b"alice:12345", &tag));
    }

    #[test]
    fn test_verify_rejects_flipped_character() {
        let signer = Signer::new("secret");
        let tag = signer.sign(b"alice:12345");

        for i in 0..tag.len() {
            let mut flipped: Vec<char> = tag.chars().collect();
            flipped[i] = if flipped[i] == '0' { '1' } else { '0' };
            let flipped: String = flipped.into_iter().collect();
            assert!(!signer.verify(b"alice:12345", &flipped), "position {}", i);
        }
    }

    #[test]
    fn test_verify_rejects_wrong_length() {
        let signer = Signer::new("secret");
        let tag = signer.sign(b"alice:12345");
        assert!(!signer.verify(b"alice:12345", &tag[..tag.len() - 1]));
        assert!(!signer.verify(b"alice:12345", ""));
    }

    #[test]
    fn test_truncated_mode_is_prefix_of_full_tag() {
        let full = Signer::new("secret");
        let compat = Signer::new("secret").with_tag_length(COMPAT_TAG_LEN);

        let tag = compat.sign(b"alice:12345");
        assert_eq!(tag.len(), COMPAT_TAG_LEN);
        assert!(full.sign(b"alice:12345").starts_with(&tag));
        assert!(compat.verify(b"alice:12345", &tag));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let signer = Signer::new("very-secret-value");
        let rendered = format!("{:?}", signer);
        assert!(!rendered.contains("very-secret-value"));
    }
}
