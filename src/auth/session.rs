//! Session management for extension authorization.
//!
//! This module provides the [`Session`] type, which records one tenant's (or
//! one browser visitor's) authorization state, together with the tenant
//! identity and the token response it is updated from.
//!
//! # Session Identity
//!
//! - **Online** sessions get a random id per authorization attempt and are
//!   never derived from tenant identity.
//! - **Offline** sessions use a deterministic id derived from the cluster and
//!   tenant id, so there is at most one offline session per tenant and it can
//!   be re-fetched without a lookup table.
//!
//! ```rust
//! use fdk_extension::{Session, SessionIdKind};
//!
//! let a = Session::generate_id(&SessionIdKind::Offline { cluster: "https://api.fynd.com", tenant_id: "1" });
//! let b = Session::generate_id(&SessionIdKind::Offline { cluster: "https://api.fynd.com", tenant_id: "1" });
//! assert_eq!(a, b);
//!
//! let online = Session::generate_id(&SessionIdKind::Online);
//! assert_ne!(online, a);
//! ```

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::{AuthScopes, CurrentUser};
use crate::config::AccessMode;

/// Cookie name prefix for company-scoped sessions.
pub const SESSION_COOKIE_NAME: &str = "ext_session";

/// Fixed cookie name for organization (partner) sessions.
pub const ADMIN_SESSION_COOKIE_NAME: &str = "admin_ext_session";

/// The tenant a session is authorized for.
///
/// Company extensions are installed per company; organization extensions
/// are installed by a partner organization.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tenant {
    /// A company (seller) tenant.
    Company(String),
    /// A partner organization tenant.
    Organization(String),
}

impl Tenant {
    /// Returns the tenant identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Company(id) | Self::Organization(id) => id,
        }
    }

    /// Returns the name of the cookie holding the session id for this tenant.
    #[must_use]
    pub fn cookie_name(&self) -> String {
        match self {
            Self::Company(id) => format!("{SESSION_COOKIE_NAME}_{id}"),
            Self::Organization(_) => ADMIN_SESSION_COOKIE_NAME.to_string(),
        }
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Company(id) => write!(f, "company:{id}"),
            Self::Organization(id) => write!(f, "organization:{id}"),
        }
    }
}

/// Input for [`Session::generate_id`].
#[derive(Clone, Copy, Debug)]
pub enum SessionIdKind<'a> {
    /// A random, per-attempt id.
    Online,
    /// A deterministic id for the given cluster and tenant.
    Offline {
        /// The platform cluster URL.
        cluster: &'a str,
        /// The company or organization id.
        tenant_id: &'a str,
    },
}

/// Token response returned by the platform token endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    /// The bearer access token.
    pub access_token: String,

    /// The token type, usually `"Bearer"`.
    #[serde(default)]
    pub token_type: Option<String>,

    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// Refresh token, issued for offline access.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Granted scopes.
    #[serde(default)]
    pub scope: Option<AuthScopes>,

    /// The authorizing user, present for online tokens.
    #[serde(default)]
    pub current_user: Option<CurrentUser>,

    /// Absolute expiry of the access token, in epoch milliseconds.
    #[serde(default)]
    pub access_token_validity: Option<i64>,
}

/// Represents one tenant's or one visitor's authorization state.
///
/// Sessions are created by the install and auto-install handlers, updated in
/// place when a token is issued, and persisted through
/// [`SessionStore`](crate::auth::SessionStore).
///
/// # Thread Safety
///
/// `Session` is `Send + Sync`, making it safe to share across threads.
///
/// # Example
///
/// ```rust
/// use fdk_extension::{AccessMode, Session, Tenant};
///
/// let session = Session::new(
///     "session-id".to_string(),
///     &Tenant::Company("1".to_string()),
///     AccessMode::Online,
///     "api-key".to_string(),
/// );
///
/// assert_eq!(session.company_id.as_deref(), Some("1"));
/// assert!(!session.is_active(chrono::Utc::now()));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session.
    pub id: String,

    /// The company tenant, for company extensions.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "string_or_number")]
    pub company_id: Option<String>,

    /// The organization tenant, for partner extensions.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "string_or_number")]
    pub organization_id: Option<String>,

    /// Nonce bound to one authorization round trip.
    #[serde(default)]
    pub state: String,

    /// Scopes granted to this session.
    #[serde(default)]
    pub scope: AuthScopes,

    /// When the stored session expires; drives the storage TTL.
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,

    /// Lifetime of the current access token in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,

    /// When the current access token expires.
    #[serde(default)]
    pub access_token_validity: Option<DateTime<Utc>>,

    /// Online or offline access.
    pub access_mode: AccessMode,

    /// The bearer access token, once issued.
    #[serde(default)]
    pub access_token: Option<String>,

    /// The refresh token, for offline sessions.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// The authorizing user, for online sessions.
    #[serde(default)]
    pub current_user: Option<CurrentUser>,

    /// API key of the extension that created the session.
    pub extension_id: String,

    /// Path to redirect to once authorization completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_path: Option<String>,
}

impl Session {
    /// Creates a new, unauthorized session for `tenant`.
    #[must_use]
    pub fn new(id: String, tenant: &Tenant, access_mode: AccessMode, extension_id: String) -> Self {
        let (company_id, organization_id) = match tenant {
            Tenant::Company(id) => (Some(id.clone()), None),
            Tenant::Organization(id) => (None, Some(id.clone())),
        };
        Self {
            id,
            company_id,
            organization_id,
            state: String::new(),
            scope: AuthScopes::new(),
            expires: None,
            expires_in: None,
            access_token_validity: None,
            access_mode,
            access_token: None,
            refresh_token: None,
            current_user: None,
            extension_id,
            redirect_path: None,
        }
    }

    /// Generates a session id.
    ///
    /// Online ids are random UUIDs. Offline ids are the hex SHA-256 digest of
    /// `"{cluster}:{tenant_id}"`, so identical inputs always yield the same id.
    #[must_use]
    pub fn generate_id(kind: &SessionIdKind<'_>) -> String {
        match kind {
            SessionIdKind::Online => uuid::Uuid::new_v4().to_string(),
            SessionIdKind::Offline { cluster, tenant_id } => {
                let digest = Sha256::digest(format!("{cluster}:{tenant_id}").as_bytes());
                hex::encode(digest)
            }
        }
    }

    /// Returns the tenant this session belongs to.
    ///
    /// The company id takes precedence if both are somehow present.
    #[must_use]
    pub fn tenant(&self) -> Option<Tenant> {
        self.company_id
            .clone()
            .map(Tenant::Company)
            .or_else(|| self.organization_id.clone().map(Tenant::Organization))
    }

    /// Applies a token response, issued at `now`.
    ///
    /// The refresh token and current user are only replaced when the
    /// response carries them, since refresh responses often omit both.
    pub fn update_token(&mut self, token: AccessTokenResponse, now: DateTime<Utc>) {
        self.access_token = Some(token.access_token);
        if let Some(refresh_token) = token.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scope) = token.scope {
            self.scope = scope;
        }
        if let Some(user) = token.current_user {
            self.current_user = Some(user);
        }
        self.expires_in = token.expires_in;
        self.access_token_validity = token
            .access_token_validity
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .or_else(|| token.expires_in.map(|secs| now + Duration::seconds(secs)));
    }

    /// Returns `true` if this session has expired.
    ///
    /// Sessions without an expiration time are considered never expired.
    #[must_use]
    pub fn expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| now > expires)
    }

    /// Returns `true` if this session has an access token and has not expired.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty()) && !self.expired(now)
    }

    /// Returns `true` if the access token expires within `window` of `now`
    /// and a refresh token is available.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.refresh_token.is_some()
            && self
                .access_token_validity
                .is_some_and(|validity| validity - now <= window)
    }
}

// Verify Session is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Session>();
};

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Str(String),
        Num(i64),
    }

    Ok(Option::<Repr>::deserialize(deserializer)?.map(|repr| match repr {
        Repr::Str(s) => s,
        Repr::Num(n) => n.to_string(),
    }))
}
