//! OAuth scope handling for platform authorization.
//!
//! This module provides the [`AuthScopes`] type for managing the ordered list
//! of permission strings requested during authorization and recorded on a
//! session.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An ordered, de-duplicated list of OAuth scopes.
///
/// Scope order is preserved because the platform echoes scopes back in the
/// order they were requested and sessions store them verbatim.
///
/// # Serialization
///
/// `AuthScopes` serializes to a JSON array of strings. It deserializes from
/// either an array or a comma-separated string, since token responses use
/// both shapes:
///
/// ```rust
/// use fdk_extension::AuthScopes;
///
/// let scopes: AuthScopes = "company/products,company/orders".parse().unwrap();
/// let json = serde_json::to_string(&scopes).unwrap();
/// assert_eq!(json, r#"["company/products","company/orders"]"#);
///
/// let parsed: AuthScopes = serde_json::from_str(r#""company/products""#).unwrap();
/// assert_eq!(parsed.len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct AuthScopes {
    scopes: Vec<String>,
}

impl AuthScopes {
    /// Creates an empty scope list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the scope list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Returns the number of scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns `true` if `scope` is present.
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Returns `true` if this list contains every scope in `other`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        other.iter().all(|s| self.contains(s))
    }

    /// Returns an iterator over the scopes in request order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(String::as_str)
    }

    fn push(&mut self, scope: &str) -> Result<(), ConfigError> {
        let scope = scope.trim();
        if scope.is_empty() {
            return Ok(());
        }
        if !scope
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '/' | '.' | '-'))
        {
            return Err(ConfigError::InvalidScopes {
                reason: format!("Invalid characters in scope: '{scope}'"),
            });
        }
        if !self.contains(scope) {
            self.scopes.push(scope.to_string());
        }
        Ok(())
    }
}

impl FromStr for AuthScopes {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scopes = Self::new();
        for scope in s.split(',') {
            scopes.push(scope)?;
        }
        Ok(scopes)
    }
}

impl TryFrom<Vec<String>> for AuthScopes {
    type Error = ConfigError;

    fn try_from(values: Vec<String>) -> Result<Self, Self::Error> {
        let mut scopes = Self::new();
        for scope in &values {
            scopes.push(scope)?;
        }
        Ok(scopes)
    }
}

impl fmt::Display for AuthScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scopes.join(","))
    }
}

impl Serialize for AuthScopes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.scopes.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AuthScopes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            List(Vec<String>),
            Joined(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::List(list) => Self::try_from(list).map_err(de::Error::custom),
            Repr::Joined(joined) => joined.parse().map_err(de::Error::custom),
        }
    }
}
