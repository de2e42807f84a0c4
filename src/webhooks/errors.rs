//! Webhook-specific error types.
//!
//! - [`WebhookError::InvalidConfig`]: the declared event map is malformed or
//!   names events the platform catalog does not know
//! - [`WebhookError::NotInitialized`]: an operation ran before
//!   [`WebhookRegistry::initialize`](super::WebhookRegistry::initialize)
//! - [`WebhookError::Registration`]: the platform rejected a subscriber call
//! - [`WebhookError::SubscriberNotFound`]: no remote subscriber exists yet
//! - [`WebhookError::HandlerNotFound`] / [`WebhookError::Process`]: inbound
//!   delivery failures
//! - [`WebhookError::InvalidSignature`]: a delivery failed verification
//!
//! # Example
//!
//! ```rust
//! use fdk_extension::webhooks::WebhookError;
//!
//! let error = WebhookError::HandlerNotFound {
//!     event: "company/product/create/v1".to_string(),
//! };
//! assert!(error.to_string().contains("company/product/create/v1"));
//! ```

use thiserror::Error;

use crate::clients::HttpError;

/// Error type for webhook registration and delivery operations.
///
/// Configuration errors abort initialization entirely. Registration errors
/// are raised after the retry policy is exhausted. Delivery errors are
/// never retried; redelivery is the sender's responsibility.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The webhook configuration is invalid.
    #[error("Invalid webhook config: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The registry has no initialized event map.
    #[error("Webhook registry not initialized")]
    NotInitialized,

    /// A subscriber or catalog call failed.
    #[error("Failed to {operation}: {source}")]
    Registration {
        /// The operation that failed, e.g. `register subscriber`.
        operation: &'static str,
        /// The underlying HTTP failure.
        #[source]
        source: HttpError,
    },

    /// No subscriber configuration exists for the company.
    #[error("Subscriber config not found for company {company_id}")]
    SubscriberNotFound {
        /// The company that was queried.
        company_id: String,
    },

    /// No handler is registered for the delivered event.
    #[error("Webhook handler not assigned: {event}")]
    HandlerNotFound {
        /// The versioned event slug.
        event: String,
    },

    /// The delivery is malformed or its handler failed.
    #[error("Webhook process failed: {message}")]
    Process {
        /// Description of the failure.
        message: String,
    },

    /// The delivery signature does not match.
    ///
    /// The message is intentionally generic.
    #[error("Signature passed does not match calculated body signature")]
    InvalidSignature,
}

// Verify WebhookError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WebhookError>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::HttpResponseError;
    use std::error::Error as _;

    #[test]
    fn test_registration_error_keeps_source() {
        let error = WebhookError::Registration {
            operation: "update subscriber",
            source: HttpError::Response(HttpResponseError {
                code: 503,
                message: "unavailable".to_string(),
                error_reference: None,
            }),
        };
        assert!(error.to_string().starts_with("Failed to update subscriber"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_invalid_signature_message_is_generic() {
        let message = WebhookError::InvalidSignature.to_string();
        assert!(!message.contains("secret"));
    }
}
