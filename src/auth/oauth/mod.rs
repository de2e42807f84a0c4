//! OAuth 2.0 support for extension installation.
//!
//! This module holds the pieces the install and auth handlers are built
//! from:
//!
//! - [`StateParam`]: the CSRF nonce bound to one authorization round-trip
//! - [`authorization_url`]: the platform consent URL for a tenant
//! - [`PlatformOAuthClient`]: the collaborator performing token exchange,
//!   with [`HttpOAuthClient`] as the reqwest-backed implementation
//! - [`OAuthError`]: errors raised by the OAuth flows
//!
//! # Flow
//!
//! 1. `install` stores a fresh [`StateParam`] on a new online session and
//!    redirects to [`PlatformOAuthClient::start_authorization`].
//! 2. `auth` compares the returned `state` with the stored nonce, then calls
//!    [`PlatformOAuthClient::verify_callback`] and, in offline mode,
//!    [`PlatformOAuthClient::get_offline_access_token`].
//! 3. Offline sessions are kept fresh with
//!    [`PlatformOAuthClient::refresh_access_token`].

mod begin_auth;
mod client;
mod error;
mod state;
mod token;

pub use begin_auth::{authorization_url, AuthorizationRequest};
pub use client::{HttpOAuthClient, PlatformOAuthClient};
pub use error::OAuthError;
pub use state::StateParam;
