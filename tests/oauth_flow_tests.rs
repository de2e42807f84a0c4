//! Integration tests for the install, auth, auto-install and uninstall flows.
//!
//! The platform token endpoints are served by a wiremock server configured
//! as the cluster, so the flows run through the default HTTP OAuth client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fdk_extension::auth::oauth::OAuthError;
use fdk_extension::extension::{
    CallbackContext, CallbackError, ExtensionCallbacks, ExtensionRequest, HandlerResponse,
};
use fdk_extension::signature::{sign_request, SignatureError};
use fdk_extension::webhooks::{EventSubscription, HandlerError, WebhookConfig, WebhookEvent};
use fdk_extension::{
    AccessMode, ApiKey, ApiSecretKey, BoxFuture, Extension, ExtensionConfig, HostUrl,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/service/panel/authentication/v1.0/company/1/oauth/token";
const OFFLINE_TOKEN_PATH: &str = "/service/panel/authentication/v1.0/company/1/oauth/offline-token";
const CATALOG_PATH: &str = "/service/common/webhook/v1.0/events/query-event-details";
const SUBSCRIBER_LIST_PATH: &str =
    "/service/platform/webhook/v2.0/company/1/extension/test-key/subscriber";
const SUBSCRIBER_WRITE_PATH: &str = "/service/platform/webhook/v2.0/company/1/subscriber/";

/// Callbacks recording which hooks ran.
#[derive(Default)]
struct RecordingCallbacks {
    uninstalled: AtomicBool,
    auto_installed: AtomicBool,
}

impl ExtensionCallbacks for RecordingCallbacks {
    fn auth<'a>(&'a self, ctx: &'a CallbackContext) -> BoxFuture<'a, Result<String, CallbackError>> {
        Box::pin(async move {
            Ok(format!(
                "https://myext.example.com/company/{}",
                ctx.tenant.id()
            ))
        })
    }

    fn uninstall<'a>(&'a self, _ctx: &'a CallbackContext) -> BoxFuture<'a, Result<(), CallbackError>> {
        Box::pin(async move {
            self.uninstalled.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn auto_install<'a>(
        &'a self,
        _ctx: &'a CallbackContext,
    ) -> BoxFuture<'a, Result<(), CallbackError>> {
        Box::pin(async move {
            self.auto_installed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}

fn create_config(cluster: &str, access_mode: AccessMode) -> ExtensionConfig {
    ExtensionConfig::builder()
        .api_key(ApiKey::new("test-key").unwrap())
        .api_secret_key(ApiSecretKey::new("test-secret").unwrap())
        .base_url(HostUrl::new("https://myext.example.com").unwrap())
        .cluster(HostUrl::new(cluster).unwrap())
        .scopes("company/products,company/orders".parse().unwrap())
        .access_mode(access_mode)
        .build()
        .unwrap()
}

async fn create_extension(
    server: &MockServer,
    access_mode: AccessMode,
    callbacks: Arc<RecordingCallbacks>,
) -> Extension {
    Extension::builder()
        .config(create_config(&server.uri(), access_mode))
        .callbacks(callbacks)
        .build()
        .await
        .unwrap()
}

async fn mount_token_endpoints(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "online-token",
            "token_type": "Bearer",
            "expires_in": 3600,
            "current_user": {"user_id": "u1", "username": "merchant"}
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(OFFLINE_TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "offline-token",
            "refresh_token": "refresh-token",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

/// Extracts the `state` query parameter from an authorization URL.
fn state_from(location: &str) -> String {
    location
        .split(['?', '&'])
        .find_map(|pair| pair.strip_prefix("state="))
        .map(str::to_string)
        .expect("authorization URL carries a state")
}

/// Runs install and returns the response together with the request that
/// replays its cookie.
async fn install(extension: &Extension, extra: &[(&str, &str)]) -> (HandlerResponse, ExtensionRequest) {
    let mut request = ExtensionRequest::new("GET", "myext.example.com", "/fp/install")
        .query("company_id", "1");
    for (name, value) in extra {
        request = request.query(*name, *value);
    }
    let response = extension.install(&request).await.unwrap();

    let cookie = &response.cookies()[0];
    let callback = ExtensionRequest::new("GET", "myext.example.com", "/fp/auth")
        .query("company_id", "1")
        .query("code", "auth-code")
        .cookie_value(cookie.name.clone(), cookie.value.clone());
    (response, callback)
}

#[tokio::test]
async fn test_install_redirects_to_consent_screen_with_session_cookie() {
    let server = MockServer::start().await;
    let extension =
        create_extension(&server, AccessMode::Offline, Arc::default()).await;

    let (response, _) = install(&extension, &[("application_id", "app-1")]).await;

    assert_eq!(response.status(), 302);
    let location = response.location().unwrap();
    assert!(location.starts_with(&format!(
        "{}/service/panel/authentication/v1.0/company/1/oauth/authorize?",
        server.uri()
    )));
    assert!(location.contains("client_id=test-key"));
    assert!(location.contains("access_mode=offline"));
    assert!(location.contains(&urlencoding::encode(
        "https://myext.example.com/fp/auth?application_id=app-1"
    ).into_owned()));

    let cookies = response.cookies();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name, "ext_session_1");
    assert!(cookies[0].value.starts_with("s:"));
    assert!(cookies[0].expires.is_some());

    let HandlerResponse::Redirect { headers, .. } = response else {
        panic!("expected a redirect");
    };
    assert!(headers.contains(&("x-company-id".to_string(), "1".to_string())));
}

#[tokio::test]
async fn test_install_without_tenant_fails() {
    let server = MockServer::start().await;
    let extension =
        create_extension(&server, AccessMode::Offline, Arc::default()).await;

    let request = ExtensionRequest::new("GET", "myext.example.com", "/fp/install");
    let result = extension.install(&request).await;

    assert!(matches!(result, Err(OAuthError::MissingTenant)));
}

#[tokio::test]
async fn test_auth_with_matching_state_redirects_to_callback_url() {
    let server = MockServer::start().await;
    mount_token_endpoints(&server).await;
    let extension =
        create_extension(&server, AccessMode::Offline, Arc::default()).await;

    let (response, callback) = install(&extension, &[]).await;
    let state = state_from(response.location().unwrap());
    let callback = callback.query("state", state);

    let response = extension.auth(&callback).await.unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(
        response.location(),
        Some("https://myext.example.com/company/1")
    );
    assert_eq!(response.cookies()[0].name, "ext_session_1");

    // Offline mode stores the deterministic offline session
    let client = extension.get_platform_client("1", None).await.unwrap();
    assert_eq!(
        client.session().access_token.as_deref(),
        Some("offline-token")
    );
    assert_eq!(client.session().access_mode, AccessMode::Offline);
}

#[tokio::test]
async fn test_auth_prefers_stashed_redirect_path() {
    let server = MockServer::start().await;
    mount_token_endpoints(&server).await;
    let extension =
        create_extension(&server, AccessMode::Online, Arc::default()).await;

    let (response, callback) = install(&extension, &[("redirect_path", "/dashboard")]).await;
    let state = state_from(response.location().unwrap());

    let response = extension.auth(&callback.query("state", state)).await.unwrap();

    assert_eq!(response.location(), Some("/dashboard"));
}

#[tokio::test]
async fn test_auth_with_mismatched_state_fails_before_token_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "t"})))
        .expect(0)
        .mount(&server)
        .await;
    let extension =
        create_extension(&server, AccessMode::Offline, Arc::default()).await;

    let (_, callback) = install(&extension, &[]).await;
    let result = extension.auth(&callback.query("state", "forged-state")).await;

    assert!(matches!(result, Err(OAuthError::InvalidOAuth)));
}

#[tokio::test]
async fn test_auth_without_cookie_fails_with_session_not_found() {
    let server = MockServer::start().await;
    let extension =
        create_extension(&server, AccessMode::Offline, Arc::default()).await;

    let callback = ExtensionRequest::new("GET", "myext.example.com", "/fp/auth")
        .query("company_id", "1")
        .query("code", "auth-code")
        .query("state", "anything");
    let result = extension.auth(&callback).await;

    assert!(matches!(result, Err(OAuthError::SessionNotFound)));
}

#[tokio::test]
async fn test_auth_with_tampered_cookie_fails_with_session_not_found() {
    let server = MockServer::start().await;
    let extension =
        create_extension(&server, AccessMode::Offline, Arc::default()).await;

    let (response, _) = install(&extension, &[]).await;
    let state = state_from(response.location().unwrap());
    let callback = ExtensionRequest::new("GET", "myext.example.com", "/fp/auth")
        .query("company_id", "1")
        .query("code", "auth-code")
        .query("state", state)
        .cookie_value("ext_session_1", "s:some-session.bad-signature");

    let result = extension.auth(&callback).await;

    assert!(matches!(result, Err(OAuthError::SessionNotFound)));
}

#[tokio::test]
async fn test_rejected_code_surfaces_token_exchange_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "invalid code"})),
        )
        .mount(&server)
        .await;
    let extension =
        create_extension(&server, AccessMode::Online, Arc::default()).await;

    let (response, callback) = install(&extension, &[]).await;
    let state = state_from(response.location().unwrap());
    let result = extension.auth(&callback.query("state", state)).await;

    assert!(matches!(
        result,
        Err(OAuthError::TokenExchangeFailed { status: 400, .. })
    ));
}

#[tokio::test]
async fn test_auto_install_persists_offline_session() {
    let server = MockServer::start().await;
    mount_token_endpoints(&server).await;
    let callbacks = Arc::new(RecordingCallbacks::default());
    let extension =
        create_extension(&server, AccessMode::Online, Arc::clone(&callbacks)).await;

    let request = ExtensionRequest::new("POST", "myext.example.com", "/fp/auto_install")
        .json(json!({"company_id": 1, "code": "install-code"}));
    let response = extension.auto_install(&request).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(callbacks.auto_installed.load(Ordering::SeqCst));
    let client = extension.get_platform_client("1", None).await.unwrap();
    assert_eq!(
        client.session().refresh_token.as_deref(),
        Some("refresh-token")
    );
}

#[tokio::test]
async fn test_signed_uninstall_deletes_offline_session() {
    let server = MockServer::start().await;
    mount_token_endpoints(&server).await;
    let callbacks = Arc::new(RecordingCallbacks::default());
    let extension =
        create_extension(&server, AccessMode::Offline, Arc::clone(&callbacks)).await;

    let install_request = ExtensionRequest::new("POST", "myext.example.com", "/fp/auto_install")
        .json(json!({"company_id": "1", "code": "install-code"}));
    extension.auto_install(&install_request).await.unwrap();

    let mut request = ExtensionRequest::new("POST", "myext.example.com", "/fp/uninstall")
        .header("content-type", "application/json")
        .json(json!({"company_id": 1, "client_id": "test-key"}));
    let mut signable = request.to_signable();
    sign_request(&mut signable, "test-secret", Utc::now());
    for (name, value) in &signable.headers {
        request = request.header(name, value.clone());
    }

    let response = extension.uninstall(&request).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(callbacks.uninstalled.load(Ordering::SeqCst));
    assert!(matches!(
        extension.get_platform_client("1", None).await,
        Err(OAuthError::SessionNotFound)
    ));
}

#[tokio::test]
async fn test_unsigned_uninstall_is_rejected() {
    let server = MockServer::start().await;
    let callbacks = Arc::new(RecordingCallbacks::default());
    let extension =
        create_extension(&server, AccessMode::Offline, Arc::clone(&callbacks)).await;

    let request = ExtensionRequest::new("POST", "myext.example.com", "/fp/uninstall")
        .json(json!({"company_id": 1}));
    let result = extension.uninstall(&request).await;

    assert!(matches!(
        result,
        Err(OAuthError::Signature(SignatureError::RequestExpired))
    ));
    assert!(!callbacks.uninstalled.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_platform_client_refreshes_expiring_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OFFLINE_TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "expiring-token",
            "refresh_token": "refresh-token",
            "expires_in": 30
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    let extension =
        create_extension(&server, AccessMode::Offline, Arc::default()).await;

    let request = ExtensionRequest::new("POST", "myext.example.com", "/fp/auto_install")
        .json(json!({"company_id": 1, "code": "install-code"}));
    extension.auto_install(&request).await.unwrap();

    let client = extension.get_platform_client("1", None).await.unwrap();
    assert_eq!(client.session().access_token.as_deref(), Some("fresh-token"));
    assert_eq!(
        client.session().refresh_token.as_deref(),
        Some("refresh-token")
    );

    // The refreshed session was saved, so no second refresh happens
    let client = extension.get_platform_client("1", None).await.unwrap();
    assert_eq!(client.session().access_token.as_deref(), Some("fresh-token"));
}

async fn create_extension_with_webhooks(server: &MockServer) -> Extension {
    Mock::given(method("POST"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "event_configs": [{
                "id": 101,
                "event_category": "company",
                "event_name": "product",
                "event_type": "create",
                "version": "1"
            }]
        })))
        .mount(server)
        .await;

    let webhooks = WebhookConfig::builder()
        .api_path("/api/webhooks")
        .notification_email("dev@example.com")
        .event(
            "company/product/create",
            EventSubscription::rest("1", |_event: WebhookEvent| async move {
                Ok::<(), HandlerError>(())
            }),
        )
        .build();

    Extension::builder()
        .config(create_config(&server.uri(), AccessMode::Offline))
        .callbacks(Arc::new(RecordingCallbacks::default()))
        .webhook_config(webhooks)
        .build()
        .await
        .unwrap()
}

/// Waits for the detached subscriber sync to reach `request_path`.
async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    for _ in 0..100 {
        let count = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == request_path)
            .count();
        if count > 0 {
            return count;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    0
}

#[tokio::test]
async fn test_auth_syncs_webhook_subscribers_after_install() {
    let server = MockServer::start().await;
    mount_token_endpoints(&server).await;
    Mock::given(method("GET"))
        .and(path(SUBSCRIBER_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUBSCRIBER_WRITE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .mount(&server)
        .await;
    let extension = create_extension_with_webhooks(&server).await;

    let (response, callback) = install(&extension, &[]).await;
    let state = state_from(response.location().unwrap());
    let response = extension.auth(&callback.query("state", state)).await.unwrap();

    assert_eq!(response.status(), 302);
    assert!(requests_to(&server, SUBSCRIBER_LIST_PATH).await >= 1);
    assert_eq!(requests_to(&server, SUBSCRIBER_WRITE_PATH).await, 1);
}

#[tokio::test]
async fn test_failed_webhook_sync_does_not_change_auth_redirect() {
    let server = MockServer::start().await;
    mount_token_endpoints(&server).await;
    Mock::given(method("GET"))
        .and(path(SUBSCRIBER_LIST_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let extension = create_extension_with_webhooks(&server).await;

    let (response, callback) = install(&extension, &[]).await;
    let state = state_from(response.location().unwrap());
    let response = extension.auth(&callback.query("state", state)).await.unwrap();

    assert_eq!(response.status(), 302);
    assert_eq!(
        response.location(),
        Some("https://myext.example.com/company/1")
    );
    assert_eq!(requests_to(&server, SUBSCRIBER_LIST_PATH).await, 1);
}

#[tokio::test]
async fn test_auto_install_syncs_webhook_subscribers() {
    let server = MockServer::start().await;
    mount_token_endpoints(&server).await;
    Mock::given(method("GET"))
        .and(path(SUBSCRIBER_LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(SUBSCRIBER_WRITE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5})))
        .mount(&server)
        .await;
    let extension = create_extension_with_webhooks(&server).await;

    let request = ExtensionRequest::new("POST", "myext.example.com", "/fp/auto_install")
        .json(json!({"company_id": 1, "code": "install-code"}));
    let response = extension.auto_install(&request).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(requests_to(&server, SUBSCRIBER_WRITE_PATH).await, 1);
}

