//! Integration tests for signed platform requests and webhook deliveries.

use chrono::{Duration, Utc};
use fdk_extension::signature::{
    sign_request, verify_request, SignableRequest, SignatureError, HEADER_DATE, HEADER_SIGNATURE,
    SIGNATURE_VERSION_PREFIX,
};
use fdk_extension::webhooks::{verify_delivery, WebhookDelivery, WebhookError};
use serde_json::json;

fn uninstall_request() -> SignableRequest {
    SignableRequest::new("POST", "myext.example.com", "/fp/uninstall?b=2&a=1")
        .header("content-type", "application/json")
        .header("x-user-data", "{\"user_id\":\"u1\"}")
        .body(json!({"company_id": 1, "client_id": "test-key"}))
}

#[test]
fn test_signed_request_verifies_with_same_secret() {
    let now = Utc::now();
    let mut request = uninstall_request();
    let signature = sign_request(&mut request, "secret", now);

    assert!(signature.starts_with(SIGNATURE_VERSION_PREFIX));
    assert_eq!(request.header_value(HEADER_SIGNATURE), Some(signature.as_str()));
    assert!(request.header_value(HEADER_DATE).is_some());
    assert!(verify_request(&request, "secret", now).is_ok());
}

#[test]
fn test_signed_request_fails_with_other_secret() {
    let now = Utc::now();
    let mut request = uninstall_request();
    sign_request(&mut request, "secret", now);

    assert_eq!(
        verify_request(&request, "other-secret", now),
        Err(SignatureError::InvalidSignature)
    );
}

#[test]
fn test_six_minute_old_request_is_expired() {
    let now = Utc::now();
    let mut request = uninstall_request();
    sign_request(&mut request, "secret", now - Duration::minutes(6));

    assert_eq!(
        verify_request(&request, "secret", now),
        Err(SignatureError::RequestExpired)
    );
}

#[test]
fn test_four_minute_old_request_is_fresh() {
    let now = Utc::now();
    let mut request = uninstall_request();
    sign_request(&mut request, "secret", now - Duration::minutes(4));

    assert!(verify_request(&request, "secret", now).is_ok());
}

#[test]
fn test_tampered_body_fails() {
    let now = Utc::now();
    let mut request = uninstall_request();
    sign_request(&mut request, "secret", now);
    let request = request.body(json!({"company_id": 2, "client_id": "test-key"}));

    assert_eq!(
        verify_request(&request, "secret", now),
        Err(SignatureError::InvalidSignature)
    );
}

#[test]
fn test_delivery_signed_with_headers_verifies() {
    let now = Utc::now();
    let body = json!({"event": {"name": "product", "type": "create"}, "company_id": 1});
    let mut signed = SignableRequest::new("POST", "myext.example.com", "/api/webhooks")
        .header("content-type", "application/json")
        .body(body.clone());
    sign_request(&mut signed, "secret", now);

    let mut delivery = WebhookDelivery::new(body).request_line(
        "POST",
        "myext.example.com",
        "/api/webhooks",
    );
    for (name, value) in &signed.headers {
        delivery = delivery.header(name, value.clone());
    }

    assert!(verify_delivery(&delivery, "secret", now).is_ok());
    assert!(matches!(
        verify_delivery(&delivery, "other", now),
        Err(WebhookError::InvalidSignature)
    ));
}

#[test]
fn test_delivery_without_signature_is_rejected() {
    let delivery = WebhookDelivery::new(json!({"company_id": 1}));

    assert!(matches!(
        verify_delivery(&delivery, "secret", Utc::now()),
        Err(WebhookError::InvalidSignature)
    ));
}
