//! Error types for the extension SDK.
//!
//! This module contains the configuration error raised by builders and
//! validated newtypes, and the error returned when the extension context
//! itself cannot be constructed.
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Error messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use fdk_extension::{ApiKey, ConfigError};
//!
//! let result = ApiKey::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyApiKey)));
//! ```

use thiserror::Error;

use crate::clients::HttpError;
use crate::webhooks::WebhookError;

/// Errors that can occur during SDK configuration.
///
/// This enum represents all possible errors that can occur when creating
/// or validating configuration types. Each variant provides a clear,
/// actionable error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// API key cannot be empty.
    #[error("API key cannot be empty. Please provide the extension's API key.")]
    EmptyApiKey,

    /// API secret key cannot be empty.
    #[error("API secret cannot be empty. Please provide the extension's API secret.")]
    EmptyApiSecretKey,

    /// Scopes are invalid.
    #[error("Invalid scopes: {reason}")]
    InvalidScopes {
        /// The reason the scopes are invalid.
        reason: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// URL is invalid.
    #[error("Invalid URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://myext.example.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },
}

/// Errors raised while assembling an [`Extension`](crate::Extension).
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// The extension configuration is incomplete or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The webhook registry failed to initialize.
    #[error(transparent)]
    Webhook(#[from] WebhookError),

    /// An HTTP client could not be created.
    #[error(transparent)]
    Http(#[from] HttpError),
}

// Verify ExtensionError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ExtensionError>();
};
