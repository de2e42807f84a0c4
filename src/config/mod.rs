//! Configuration types for the extension SDK.
//!
//! This module provides the configuration an extension context is built
//! from: credentials, the public base URL the platform calls back into,
//! requested scopes, the access mode and the platform cluster.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`ExtensionConfig`]: The main configuration struct holding all SDK settings
//! - [`ExtensionConfigBuilder`]: A builder for constructing [`ExtensionConfig`] instances
//! - [`AccessMode`]: Whether the extension keeps per-tenant offline tokens
//! - [`ApiKey`]: A validated API key newtype
//! - [`ApiSecretKey`]: A validated API secret key newtype with masked debug output
//! - [`HostUrl`]: A validated absolute URL
//!
//! # Example
//!
//! ```rust
//! use fdk_extension::{ExtensionConfig, ApiKey, ApiSecretKey, HostUrl};
//!
//! let config = ExtensionConfig::builder()
//!     .api_key(ApiKey::new("my-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("my-secret").unwrap())
//!     .base_url(HostUrl::new("https://myext.example.com").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.cluster().as_ref(), "https://api.fynd.com");
//! ```

mod newtypes;

pub use newtypes::{ApiKey, ApiSecretKey, HostUrl};

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::AuthScopes;
use crate::clients::SDK_VERSION;
use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// The platform cluster used when none is configured.
pub const DEFAULT_CLUSTER: &str = "https://api.fynd.com";

/// Default timeout applied to every outbound platform request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Token access mode requested during authorization.
///
/// In `Offline` mode the extension additionally keeps one long-lived,
/// refresh-capable session per tenant under a deterministic id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Tokens bound to a single browser session.
    Online,
    /// Per-tenant tokens that outlive the browser session.
    #[default]
    Offline,
}

impl AccessMode {
    /// Returns the wire representation (`"online"` or `"offline"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    /// Returns `true` for [`AccessMode::Online`].
    #[must_use]
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for an extension.
///
/// This struct holds all configuration needed for SDK operations. It is
/// shared by `Arc` between the extension context, the webhook registry and
/// the platform clients.
///
/// # Thread Safety
///
/// `ExtensionConfig` is `Clone`, `Send`, and `Sync`, making it safe to share
/// across threads and async tasks.
///
/// # Example
///
/// ```rust
/// use fdk_extension::{AccessMode, ApiKey, ApiSecretKey, ExtensionConfig, HostUrl};
///
/// let config = ExtensionConfig::builder()
///     .api_key(ApiKey::new("your-api-key").unwrap())
///     .api_secret_key(ApiSecretKey::new("your-secret").unwrap())
///     .base_url(HostUrl::new("https://myext.example.com").unwrap())
///     .access_mode(AccessMode::Online)
///     .build()
///     .unwrap();
///
/// assert!(config.access_mode().is_online());
/// ```
#[derive(Clone, Debug)]
pub struct ExtensionConfig {
    api_key: ApiKey,
    api_secret_key: ApiSecretKey,
    base_url: HostUrl,
    scopes: AuthScopes,
    access_mode: AccessMode,
    cluster: HostUrl,
    user_agent_prefix: Option<String>,
    request_timeout: Duration,
    retry_policy: RetryPolicy,
}

impl ExtensionConfig {
    /// Creates a new builder for constructing an `ExtensionConfig`.
    #[must_use]
    pub fn builder() -> ExtensionConfigBuilder {
        ExtensionConfigBuilder::new()
    }

    /// Returns the API key.
    #[must_use]
    pub const fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Returns the API secret key.
    #[must_use]
    pub const fn api_secret_key(&self) -> &ApiSecretKey {
        &self.api_secret_key
    }

    /// Returns the public base URL of the extension.
    #[must_use]
    pub const fn base_url(&self) -> &HostUrl {
        &self.base_url
    }

    /// Returns the OAuth scopes.
    #[must_use]
    pub const fn scopes(&self) -> &AuthScopes {
        &self.scopes
    }

    /// Returns the access mode.
    #[must_use]
    pub const fn access_mode(&self) -> AccessMode {
        self.access_mode
    }

    /// Returns the platform cluster URL.
    #[must_use]
    pub const fn cluster(&self) -> &HostUrl {
        &self.cluster
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the timeout applied to outbound platform requests.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the retry policy for outbound webhook registry calls.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the OAuth callback URL (`{base_url}/fp/auth`).
    #[must_use]
    pub fn callback_url(&self) -> String {
        self.base_url.join("/fp/auth")
    }

    /// Returns the `User-Agent` header value sent with platform requests.
    #[must_use]
    pub fn user_agent(&self) -> String {
        let base = format!("fdk-extension-rust/{SDK_VERSION} (Rust)");
        match &self.user_agent_prefix {
            Some(prefix) => format!("{prefix} | {base}"),
            None => base,
        }
    }
}

// Verify ExtensionConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ExtensionConfig>();
};

/// Builder for constructing [`ExtensionConfig`] instances.
///
/// Required fields are `api_key`, `api_secret_key` and `base_url`.
///
/// # Defaults
///
/// - `scopes`: Empty
/// - `access_mode`: [`AccessMode::Offline`]
/// - `cluster`: `https://api.fynd.com`
/// - `user_agent_prefix`: `None`
/// - `request_timeout`: 30 seconds
/// - `retry_policy`: [`RetryPolicy::default`]
#[derive(Debug, Default)]
pub struct ExtensionConfigBuilder {
    api_key: Option<ApiKey>,
    api_secret_key: Option<ApiSecretKey>,
    base_url: Option<HostUrl>,
    scopes: Option<AuthScopes>,
    access_mode: Option<AccessMode>,
    cluster: Option<HostUrl>,
    user_agent_prefix: Option<String>,
    request_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ExtensionConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key (required).
    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the API secret key (required).
    #[must_use]
    pub fn api_secret_key(mut self, key: ApiSecretKey) -> Self {
        self.api_secret_key = Some(key);
        self
    }

    /// Sets the public base URL of the extension (required).
    #[must_use]
    pub fn base_url(mut self, url: HostUrl) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the OAuth scopes.
    #[must_use]
    pub fn scopes(mut self, scopes: AuthScopes) -> Self {
        self.scopes = Some(scopes);
        self
    }

    /// Sets the access mode.
    #[must_use]
    pub const fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = Some(mode);
        self
    }

    /// Sets the platform cluster URL.
    #[must_use]
    pub fn cluster(mut self, cluster: HostUrl) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the timeout for outbound platform requests.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the retry policy for webhook registry calls.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Builds the [`ExtensionConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `api_key`,
    /// `api_secret_key` or `base_url` are not set.
    pub fn build(self) -> Result<ExtensionConfig, ConfigError> {
        let api_key = self
            .api_key
            .ok_or(ConfigError::MissingRequiredField { field: "api_key" })?;
        let api_secret_key = self
            .api_secret_key
            .ok_or(ConfigError::MissingRequiredField {
                field: "api_secret_key",
            })?;
        let base_url = self
            .base_url
            .ok_or(ConfigError::MissingRequiredField { field: "base_url" })?;
        let cluster = match self.cluster {
            Some(cluster) => cluster,
            None => HostUrl::new(DEFAULT_CLUSTER)?,
        };

        Ok(ExtensionConfig {
            api_key,
            api_secret_key,
            base_url,
            scopes: self.scopes.unwrap_or_default(),
            access_mode: self.access_mode.unwrap_or_default(),
            cluster,
            user_agent_prefix: self.user_agent_prefix,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> ExtensionConfigBuilder {
        ExtensionConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .base_url(HostUrl::new("https://myext.example.com").unwrap())
    }

    #[test]
    fn test_builder_requires_api_key() {
        let result = ExtensionConfigBuilder::new()
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .base_url(HostUrl::new("https://myext.example.com").unwrap())
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField { field: "api_key" })
        ));
    }

    #[test]
    fn test_builder_requires_base_url() {
        let result = ExtensionConfigBuilder::new()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField { field: "base_url" })
        ));
    }

    #[test]
    fn test_builder_provides_sensible_defaults() {
        let config = base_builder().build().unwrap();

        assert_eq!(config.access_mode(), AccessMode::Offline);
        assert_eq!(config.cluster().as_ref(), DEFAULT_CLUSTER);
        assert!(config.scopes().is_empty());
        assert!(config.user_agent_prefix().is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.retry_policy(), &RetryPolicy::default());
    }

    #[test]
    fn test_callback_url_is_derived_from_base_url() {
        let config = base_builder().build().unwrap();
        assert_eq!(config.callback_url(), "https://myext.example.com/fp/auth");
    }

    #[test]
    fn test_user_agent_includes_prefix() {
        let config = base_builder().user_agent_prefix("MyExt/1.0").build().unwrap();
        let ua = config.user_agent();
        assert!(ua.starts_with("MyExt/1.0 | fdk-extension-rust/"));
    }

    #[test]
    fn test_access_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AccessMode::Online).unwrap(),
            "\"online\""
        );
        let mode: AccessMode = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(mode, AccessMode::Offline);
        assert_eq!(AccessMode::Online.to_string(), "online");
    }

    #[test]
    fn test_config_debug_masks_secret() {
        let config = base_builder().build().unwrap();
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("ExtensionConfig"));
        assert!(!debug_str.contains("\"secret\""));
    }
}
