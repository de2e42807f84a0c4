//! # Fynd Platform Extension SDK
//!
//! A Rust SDK for building Fynd Platform extensions. It runs the OAuth install
//! flow for companies and partner organizations, persists their sessions,
//! and keeps the platform's webhook subscribers in sync with the events the
//! extension declares.
//!
//! ## Overview
//!
//! This SDK provides:
//! - Type-safe configuration via [`ExtensionConfig`] and [`ExtensionConfigBuilder`]
//! - Validated newtypes for API credentials and URLs
//! - Online and offline [`Session`]s with deterministic offline ids
//! - Pluggable session storage via [`StorageAdapter`] ([`MemoryStorage`] included)
//! - Install, auth, auto-install and uninstall handlers on [`Extension`]
//! - Signed request verification via [`signature`]
//! - Webhook subscriber reconciliation and delivery dispatch via [`webhooks`]
//! - Keyed retry with exponential backoff via [`RetryManager`]
//!
//! ## Quick Start
//!
//! ```rust
//! use fdk_extension::{AccessMode, ApiKey, ApiSecretKey, ExtensionConfig, HostUrl};
//!
//! let config = ExtensionConfig::builder()
//!     .api_key(ApiKey::new("your-api-key").unwrap())
//!     .api_secret_key(ApiSecretKey::new("your-api-secret").unwrap())
//!     .base_url(HostUrl::new("https://myext.example.com").unwrap())
//!     .scopes("company/products,company/orders".parse().unwrap())
//!     .access_mode(AccessMode::Offline)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.callback_url(), "https://myext.example.com/fp/auth");
//! ```
//!
//! ## Handling Requests
//!
//! The SDK is not tied to an HTTP framework. Translate the inbound request
//! into an [`extension::ExtensionRequest`], call the matching handler and map
//! the [`extension::HandlerResponse`] back:
//!
//! ```rust,ignore
//! use fdk_extension::extension::{ExtensionRequest, HandlerResponse};
//!
//! let request = ExtensionRequest::new("GET", host, "/fp/auth")
//!     .query("company_id", company_id)
//!     .query("code", code)
//!     .query("state", state)
//!     .header("cookie", cookie_header);
//!
//! match extension.auth(&request).await? {
//!     HandlerResponse::Redirect { location, cookies, headers } => { /* 302 */ }
//!     HandlerResponse::Json { status, body } => { /* JSON */ }
//! }
//! ```
//!
//! ## Webhooks
//!
//! ```rust,ignore
//! use fdk_extension::webhooks::{EventSubscription, WebhookConfig, WebhookEvent};
//!
//! let webhooks = WebhookConfig::builder()
//!     .api_path("/api/webhook-events")
//!     .notification_email("dev@example.com")
//!     .event(
//!         "company/product/create",
//!         EventSubscription::rest("1", |event: WebhookEvent| async move {
//!             println!("{} for company {:?}", event.name, event.company_id);
//!             Ok(())
//!         }),
//!     )
//!     .build();
//!
//! let extension = Extension::builder()
//!     .config(config)
//!     .callbacks(callbacks)
//!     .webhook_config(webhooks)
//!     .build()
//!     .await?;
//! ```
//!
//! ## Making API Requests
//!
//! ```rust,ignore
//! use fdk_extension::clients::{HttpMethod, HttpRequest};
//!
//! // Loads the company's offline session, refreshing it if needed
//! let client = extension.get_platform_client("1", None).await?;
//!
//! let request = HttpRequest::builder(
//!     HttpMethod::Get,
//!     "/service/platform/catalog/v1.0/company/1/products",
//! )
//! .build()
//! .unwrap();
//!
//! let response = client.request(request).await?;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: the extension context is constructed and passed explicitly
//! - **Fail-fast validation**: newtypes and webhook declarations validate on construction
//! - **Thread-safe**: all public types are `Send + Sync`
//! - **Async-first**: designed for use with the Tokio runtime

use std::future::Future;
use std::pin::Pin;

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod extension;
pub mod retry;
pub mod signature;
pub mod webhooks;

/// Boxed, `Send` future returned by the SDK's async trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// Re-export public types at crate root for convenience
pub use auth::{
    AuthScopes, CurrentUser, MemoryStorage, Session, SessionIdKind, SessionStore, StorageAdapter,
    StorageError, Tenant,
};
pub use config::{
    AccessMode, ApiKey, ApiSecretKey, ExtensionConfig, ExtensionConfigBuilder, HostUrl,
};
pub use error::{ConfigError, ExtensionError};
pub use extension::{Extension, ExtensionBuilder};
pub use retry::{RetryManager, RetryPolicy, RetryableError};

// Re-export HTTP client types
pub use clients::{HttpError, PlatformClient};

// Re-export OAuth types for convenience
pub use auth::oauth::{OAuthError, StateParam};

// Re-export webhook types
pub use webhooks::{WebhookConfig, WebhookError, WebhookRegistry};
