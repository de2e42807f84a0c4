//! Inbound webhook delivery verification.
//!
//! Deliveries carry an `x-fp-signature` header in one of two forms:
//!
//! - **Legacy**: hex HMAC-SHA256 of the JSON-serialized body, keyed with the
//!   extension API secret. No timestamp.
//! - **Signed headers**: a `v1.1:` prefixed signature accompanied by
//!   `x-fp-date`, verified with [`verify_request`] over the request line,
//!   the signed headers and the body.
//!
//! Senders on both protocol versions may be in flight at once, so
//! [`verify_delivery`] accepts either.
//!
//! # Example
//!
//! ```rust
//! use fdk_extension::signature::hmac::compute_signature;
//! use fdk_extension::webhooks::{verify_delivery, WebhookDelivery};
//! use serde_json::json;
//!
//! let body = json!({"event": {"name": "product", "type": "create"}, "company_id": 1});
//! let signature = compute_signature(&serde_json::to_string(&body).unwrap(), "secret");
//! let delivery = WebhookDelivery::new(body).header("x-fp-signature", signature);
//!
//! assert!(verify_delivery(&delivery, "secret", chrono::Utc::now()).is_ok());
//! assert!(verify_delivery(&delivery, "other", chrono::Utc::now()).is_err());
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::signature::hmac::{compute_signature, constant_time_compare};
use crate::signature::{
    verify_request, SignableRequest, HEADER_DATE, HEADER_SIGNATURE, SIGNATURE_VERSION_PREFIX,
};
use crate::webhooks::WebhookError;

/// The method, host and path a delivery was received on.
#[derive(Clone, Debug, PartialEq, Eq)]
struct RequestLine {
    method: String,
    host: String,
    path: String,
}

/// An inbound webhook delivery.
///
/// The body is kept as parsed JSON; with `serde_json`'s `preserve_order`
/// feature re-serialization keeps the sender's key order, which the legacy
/// signature depends on.
#[derive(Clone, Debug)]
pub struct WebhookDelivery {
    body: Value,
    headers: BTreeMap<String, String>,
    request_line: Option<RequestLine>,
}

impl WebhookDelivery {
    /// Creates a delivery without headers.
    #[must_use]
    pub fn new(body: Value) -> Self {
        Self {
            body,
            headers: BTreeMap::new(),
            request_line: None,
        }
    }

    /// Adds a header; the name is lowercased.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Records the request line, needed for the signed-header scheme.
    #[must_use]
    pub fn request_line(
        mut self,
        method: &str,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.request_line = Some(RequestLine {
            method: method.to_string(),
            host: host.into(),
            path: path.into(),
        });
        self
    }

    /// Returns the delivery body.
    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Returns a header value by lowercase name.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Builds the signed-header view of this delivery, when it uses that
    /// scheme.
    fn signed_request(&self) -> Option<SignableRequest> {
        let signature = self.header_value(HEADER_SIGNATURE)?;
        if !signature.starts_with(SIGNATURE_VERSION_PREFIX) {
            return None;
        }
        self.header_value(HEADER_DATE)?;
        let line = self.request_line.as_ref()?;

        let mut request = SignableRequest::new(&line.method, line.host.clone(), line.path.clone())
            .body(self.body.clone());
        request.headers.clone_from(&self.headers);
        Some(request)
    }
}

/// Verifies `delivery` against `secret`.
///
/// # Errors
///
/// Returns [`WebhookError::InvalidSignature`] when the signature is missing,
/// stale, or does not match.
pub fn verify_delivery(
    delivery: &WebhookDelivery,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), WebhookError> {
    if let Some(request) = delivery.signed_request() {
        return verify_request(&request, secret, now).map_err(|e| {
            tracing::debug!("Webhook delivery rejected: {e}");
            WebhookError::InvalidSignature
        });
    }

    let provided = delivery
        .header_value(HEADER_SIGNATURE)
        .ok_or(WebhookError::InvalidSignature)?;
    let payload = serde_json::to_string(&delivery.body).map_err(|e| WebhookError::Process {
        message: e.to_string(),
    })?;
    let expected = compute_signature(&payload, secret);

    if constant_time_compare(provided, &expected) {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}
