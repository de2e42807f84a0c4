//! OAuth-specific error types for the extension SDK.
//!
//! This module contains the errors raised by the install, auth, auto-install
//! and uninstall flows and by the platform OAuth client.
//!
//! # Error Types
//!
//! - [`OAuthError::SessionNotFound`]: No usable session for the request
//! - [`OAuthError::InvalidOAuth`]: The callback `state` does not match the session
//! - [`OAuthError::MissingTenant`]: Neither `company_id` nor `organization_id` supplied
//! - [`OAuthError::InvalidCallback`]: Callback parameters are malformed
//! - [`OAuthError::TokenExchangeFailed`]: The token endpoint rejected the exchange
//! - [`OAuthError::Callback`]: An integrator callback failed
//! - [`OAuthError::Storage`], [`OAuthError::Signature`], [`OAuthError::HttpError`]:
//!   wrapped lower-level failures
//!
//! # Example
//!
//! ```rust
//! use fdk_extension::auth::oauth::OAuthError;
//!
//! let error = OAuthError::InvalidOAuth;
//! assert_eq!(error.to_string(), "Invalid OAuth callback: state does not match session");
//! ```

use thiserror::Error;

use crate::auth::StorageError;
use crate::clients::HttpError;
use crate::signature::SignatureError;

/// Errors that can occur during OAuth operations.
///
/// All variants are terminal for the request that raised them; none are
/// retried. The integrator maps them to HTTP status codes.
///
/// # Thread Safety
///
/// `OAuthError` is `Send + Sync`, making it safe to use across async boundaries.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// No session exists for the incoming cookie, or it belongs to another
    /// extension.
    #[error("Can not complete oauth process as session not found")]
    SessionNotFound,

    /// OAuth state parameter mismatch.
    ///
    /// The `state` in the callback does not equal the nonce stored on the
    /// session during install. This is the CSRF guard and is checked before
    /// any token exchange.
    #[error("Invalid OAuth callback: state does not match session")]
    InvalidOAuth,

    /// The request named no company or organization.
    #[error("Request must carry a company_id or organization_id")]
    MissingTenant,

    /// Callback parameters are invalid or malformed.
    #[error("Invalid callback: {reason}")]
    InvalidCallback {
        /// Description of what's invalid about the callback.
        reason: String,
    },

    /// Token exchange request failed.
    #[error("Token exchange failed with status {status}: {message}")]
    TokenExchangeFailed {
        /// The HTTP status code returned.
        status: u16,
        /// The error message from the response.
        message: String,
    },

    /// An extension callback returned an error.
    #[error("Extension callback failed: {message}")]
    Callback {
        /// The callback's error message.
        message: String,
    },

    /// Session storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Signed request verification failed.
    #[error(transparent)]
    Signature(#[from] SignatureError),

    /// Wrapped HTTP client error.
    #[error(transparent)]
    HttpError(#[from] HttpError),
}

// Verify OAuthError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuthError>();
};
