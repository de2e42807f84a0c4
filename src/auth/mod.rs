//! Authentication types for the extension SDK.
//!
//! This module provides types for handling OAuth scopes, sessions, session
//! persistence and the authorizing user.
//!
//! # Overview
//!
//! - [`AuthScopes`]: An ordered list of OAuth scopes
//! - [`Session`]: One tenant's or one visitor's authorization state
//! - [`Tenant`]: The company or organization a session belongs to
//! - [`CurrentUser`]: User information for online sessions
//! - [`SessionStore`]: TTL-aware persistence over a [`StorageAdapter`]
//! - [`oauth`]: Platform OAuth client and its errors
//!
//! # Session Types
//!
//! - **Online sessions**: created per authorization attempt, stored with a
//!   TTL and left to expire.
//! - **Offline sessions**: one per tenant under a deterministic id, holding a
//!   refresh-capable token for background work such as webhook sync.

mod current_user;
pub mod oauth;
mod scopes;
pub mod session;
mod store;

pub use current_user::CurrentUser;
pub use scopes::AuthScopes;
pub use session::{AccessTokenResponse, Session, SessionIdKind, Tenant};
pub use store::{MemoryStorage, SessionStore, StorageAdapter, StorageError};
