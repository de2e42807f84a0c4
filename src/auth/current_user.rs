//! Current user information returned with online access tokens.
//!
//! When an extension is authorized in online mode, the token response
//! includes the platform user who performed the authorization. The shape of
//! that object varies between platform releases, so only the commonly used
//! fields are typed and everything else is preserved in [`CurrentUser::extra`].
//!
//! # Example
//!
//! ```rust
//! use fdk_extension::CurrentUser;
//!
//! let user: CurrentUser = serde_json::from_str(
//!     r#"{"_id": "5f1c", "first_name": "Jane", "last_name": "Doe", "debug": {"source": "grimlock"}}"#,
//! ).unwrap();
//!
//! assert_eq!(user.user_id.as_deref(), Some("5f1c"));
//! assert!(user.extra.contains_key("debug"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Represents the platform user associated with an online session.
///
/// # Serialization
///
/// Unknown fields round-trip through [`CurrentUser::extra`], so storing a
/// session and loading it back never loses user attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// The platform user id.
    #[serde(rename = "_id", alias = "user_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// The user's first name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// The user's last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// The user's login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Any remaining attributes, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CurrentUser {
    /// Returns the user's display name, joining first and last name.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(name), None) | (None, Some(name)) => Some(name.clone()),
            (None, None) => self.username.clone(),
        }
    }
}

// Verify CurrentUser is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<CurrentUser>();
};
