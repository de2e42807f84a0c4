//! Request authenticity and freshness checks.
//!
//! - [`hmac`]: HMAC-SHA256 / SHA-256 primitives and constant-time comparison
//! - [`sign_request`] / [`verify_request`]: the signed-header scheme used on
//!   platform-to-extension calls
//!
//! Verification fails closed: callers must not process a request body once
//! [`verify_request`] has returned an error.

pub mod hmac;
mod request;

pub use request::{
    canonical_query, sign_request, verify_request, SignableRequest, DATE_FORMAT, HEADER_DATE,
    HEADER_SIGNATURE, MAX_CLOCK_SKEW_SECS, SIGNATURE_VERSION_PREFIX,
};

use thiserror::Error;

/// Errors raised when a signed request fails verification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature is missing or does not match the request.
    #[error("Signature passed does not match calculated signature")]
    InvalidSignature,

    /// The `x-fp-date` header is missing, unparsable, or outside the
    /// allowed clock skew.
    #[error("Request expired or x-fp-date header is invalid")]
    RequestExpired,
}

// Verify SignatureError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SignatureError>();
};
