//! HMAC-SHA256 and SHA-256 helpers.
//!
//! These primitives back request signatures, signed cookies and the legacy
//! webhook delivery signature.
//!
//! # Security
//!
//! All signature comparisons use [`constant_time_compare`] to prevent timing
//! attacks.
//!
//! # Example
//!
//! ```rust
//! use fdk_extension::signature::hmac::{compute_signature, compute_signature_base64};
//!
//! let signature = compute_signature("payload", "my-api-secret");
//! assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
//!
//! let cookie_sig = compute_signature_base64(b"session-id", "my-api-secret");
//! assert_eq!(cookie_sig.len(), 43); // unpadded base64 of 32 bytes
//! ```

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

fn mac(message: &[u8], secret: &str) -> Vec<u8> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Computes an HMAC-SHA256 signature, returned as lowercase hex.
///
/// # Example
///
/// ```rust
/// use fdk_extension::signature::hmac::compute_signature;
///
/// let sig = compute_signature("test-message", "secret-key");
/// assert_eq!(sig.len(), 64);
/// ```
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn compute_signature(message: &str, secret: &str) -> String {
    hex::encode(mac(message.as_bytes(), secret))
}

/// Computes an HMAC-SHA256 signature over raw bytes, returned as unpadded
/// standard base64.
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn compute_signature_base64(message: &[u8], secret: &str) -> String {
    STANDARD_NO_PAD.encode(mac(message, secret))
}

/// Returns the lowercase hex SHA-256 digest of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Performs constant-time comparison of two strings.
///
/// Strings of different lengths compare unequal.
#[must_use]
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_signature_matches_known_vector() {
        // RFC 4231 test case 2
        let sig = compute_signature("what do ya want for nothing?", "Jefe");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_compute_signature_differs_by_secret() {
        assert_ne!(
            compute_signature("message", "secret-a"),
            compute_signature("message", "secret-b")
        );
    }

    #[test]
    fn test_sha256_hex_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(constant_time_compare("", ""));
    }
}
