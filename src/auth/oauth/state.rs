//! State parameter handling for OAuth CSRF protection.
//!
//! The install handler stores a fresh [`StateParam`] on the online session
//! and sends it to the platform with the authorization request. The auth
//! callback must echo it back unchanged.
//!
//! # Example
//!
//! ```rust
//! use fdk_extension::auth::oauth::StateParam;
//!
//! let state = StateParam::new();
//! assert_eq!(state.as_ref().len(), 32);
//! assert!(state.matches(state.as_ref()));
//! assert!(!state.matches("forged"));
//! ```

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;

use crate::signature::hmac::constant_time_compare;

/// OAuth state parameter for CSRF protection.
///
/// # Thread Safety
///
/// `StateParam` is `Send + Sync`, making it safe to share across threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateParam {
    value: String,
}

// Verify StateParam is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<StateParam>();
};

impl StateParam {
    /// The length of generated nonces.
    const NONCE_LENGTH: usize = 32;

    /// Creates a new state parameter with a cryptographically secure random
    /// alphanumeric nonce.
    #[must_use]
    pub fn new() -> Self {
        let value: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(Self::NONCE_LENGTH)
            .map(char::from)
            .collect();
        Self { value }
    }

    /// Wraps a stored state value.
    #[must_use]
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Compares `received` with this state in constant time.
    ///
    /// An empty stored state never matches.
    #[must_use]
    pub fn matches(&self, received: &str) -> bool {
        !self.value.is_empty() && constant_time_compare(&self.value, received)
    }

    /// Consumes the parameter, returning the raw value.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.value
    }
}

impl Default for StateParam {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StateParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl AsRef<str> for StateParam {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_alphanumeric_nonce() {
        let state = StateParam::new();
        assert_eq!(state.as_ref().len(), 32);
        assert!(state.as_ref().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_new_generates_unique_nonces() {
        assert_ne!(StateParam::new(), StateParam::new());
    }

    #[test]
    fn test_matches_requires_exact_value() {
        let state = StateParam::from_raw("abc");
        assert!(state.matches("abc"));
        assert!(!state.matches("abcd"));
        assert!(!state.matches(""));
    }

    #[test]
    fn test_empty_state_never_matches() {
        assert!(!StateParam::from_raw("").matches(""));
    }
}
