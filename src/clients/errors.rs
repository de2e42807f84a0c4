//! HTTP-specific error types for platform API calls.
//!
//! - [`HttpResponseError`]: Non-2xx HTTP responses from the platform
//! - [`InvalidHttpRequestError`]: A request that fails validation before sending
//! - [`HttpError::Json`]: A body that is not the JSON shape the call expects
//! - [`HttpError`]: Unified error type encompassing all HTTP-related errors
//!
//! Retries are not performed by the client itself. [`HttpError`] implements
//! [`RetryableError`] so callers can hand requests to a
//! [`RetryManager`](crate::RetryManager).
//!
//! # Example
//!
//! ```rust,ignore
//! use fdk_extension::clients::HttpError;
//!
//! match client.request(request).await {
//!     Ok(response) => println!("Success: {}", response.body),
//!     Err(err) if err.is_not_found() => println!("No such resource"),
//!     Err(HttpError::Response(e)) => println!("API error {}: {}", e.code, e.message),
//!     Err(err) => println!("Request failed: {err}"),
//! }
//! ```

use thiserror::Error;

use crate::retry::RetryableError;

/// Error returned when an HTTP request receives a non-successful response.
///
/// The message field carries the response body, or a JSON object built from
/// its `message`/`error` fields when the body is JSON.
///
/// # Example
///
/// ```rust
/// use fdk_extension::clients::HttpResponseError;
///
/// let error = HttpResponseError {
///     code: 404,
///     message: r#"{"message":"Not found"}"#.to_string(),
///     error_reference: Some("abc-123".to_string()),
/// };
///
/// assert_eq!(error.to_string(), r#"{"message":"Not found"}"#);
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// Serialized error message.
    pub message: String,
    /// Reference ID for error reporting (from the `x-request-id` header).
    pub error_reference: Option<String>,
}

/// Error returned when an HTTP request fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A request body was provided without specifying the body type.
    #[error("Cannot set a body without also setting body_type.")]
    MissingBodyType,

    /// A POST or PUT request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },
}

/// Unified error type for all HTTP-related errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// An HTTP response error (non-2xx status code).
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A request body could not be encoded or a response body decoded.
    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl HttpError {
    /// Returns the response status code, if a response was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response(e) => Some(e.code),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidRequest(_) | Self::Json(_) => None,
        }
    }

    /// Returns `true` for `404 Not Found` responses.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if the request timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout(),
            Self::Response(e) => e.code == 408,
            Self::InvalidRequest(_) | Self::Json(_) => false,
        }
    }
}

impl RetryableError for HttpError {
    /// Timeouts and `502`/`503`/`504` responses are transient.
    fn is_retryable(&self) -> bool {
        self.is_timeout() || matches!(self.status(), Some(502..=504))
    }
}

// Verify HttpError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpError>();
};
