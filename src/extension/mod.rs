//! The extension context and its HTTP flows.
//!
//! An [`Extension`] owns everything the install, auth, auto-install and
//! uninstall handlers need: the configuration, the session store, the
//! platform OAuth client, the integrator callbacks and, optionally, the
//! webhook registry. It is built once at startup and shared by reference;
//! there is no global state.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fdk_extension::{ApiKey, ApiSecretKey, Extension, ExtensionConfig, HostUrl};
//! use fdk_extension::extension::{CallbackContext, CallbackError, ExtensionCallbacks, ExtensionRequest};
//! use fdk_extension::BoxFuture;
//!
//! struct Callbacks;
//!
//! impl ExtensionCallbacks for Callbacks {
//!     fn auth<'a>(&'a self, _ctx: &'a CallbackContext) -> BoxFuture<'a, Result<String, CallbackError>> {
//!         Box::pin(async { Ok("https://myext.example.com/".to_string()) })
//!     }
//!     fn uninstall<'a>(&'a self, _ctx: &'a CallbackContext) -> BoxFuture<'a, Result<(), CallbackError>> {
//!         Box::pin(async { Ok(()) })
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtensionConfig::builder()
//!     .api_key(ApiKey::new("my-key")?)
//!     .api_secret_key(ApiSecretKey::new("secret")?)
//!     .base_url(HostUrl::new("https://myext.example.com")?)
//!     .scopes("company/products".parse()?)
//!     .build()?;
//!
//! let extension = Extension::builder()
//!     .config(config)
//!     .callbacks(Arc::new(Callbacks))
//!     .build()
//!     .await?;
//!
//! let request = ExtensionRequest::new("GET", "myext.example.com", "/fp/install")
//!     .query("company_id", "1");
//! let response = extension.install(&request).await?;
//! assert_eq!(response.status(), 302);
//! # Ok(())
//! # }
//! ```

mod callbacks;
mod cookie;
mod handlers;
mod request;

pub use callbacks::{CallbackContext, CallbackError, ExtensionCallbacks};
pub use cookie::{parse_cookie_header, sign_cookie, unsign_cookie, SetCookie};
pub use request::{ExtensionRequest, HandlerResponse};

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::oauth::{HttpOAuthClient, OAuthError, PlatformOAuthClient};
use crate::auth::{MemoryStorage, Session, SessionIdKind, SessionStore, StorageAdapter, Tenant};
use crate::clients::PlatformClient;
use crate::config::ExtensionConfig;
use crate::error::{ConfigError, ExtensionError};
use crate::webhooks::{WebhookConfig, WebhookRegistry};

/// Access tokens expiring within this window are refreshed before use.
const REFRESH_WINDOW_SECS: i64 = 120;

/// A configured extension.
///
/// # Thread Safety
///
/// `Extension` is `Send + Sync`; share it behind an `Arc` across request
/// handlers.
pub struct Extension {
    config: Arc<ExtensionConfig>,
    sessions: SessionStore,
    oauth: Arc<dyn PlatformOAuthClient>,
    callbacks: Arc<dyn ExtensionCallbacks>,
    webhooks: Option<Arc<WebhookRegistry>>,
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("config", &self.config)
            .field("sessions", &self.sessions)
            .field("webhooks", &self.webhooks)
            .finish_non_exhaustive()
    }
}

// Verify Extension is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Extension>();
};

impl Extension {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> ExtensionBuilder {
        ExtensionBuilder::new()
    }

    /// Returns the extension configuration.
    #[must_use]
    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    /// Returns the session store.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Returns the webhook registry, when webhooks were configured.
    #[must_use]
    pub const fn webhook_registry(&self) -> Option<&Arc<WebhookRegistry>> {
        self.webhooks.as_ref()
    }

    /// Returns the deterministic offline session id for `tenant`.
    #[must_use]
    pub fn offline_session_id(&self, tenant: &Tenant) -> String {
        Session::generate_id(&SessionIdKind::Offline {
            cluster: self.config.cluster().as_ref(),
            tenant_id: tenant.id(),
        })
    }

    /// Loads a session, treating sessions created by another extension as
    /// absent.
    pub(crate) async fn load_session(&self, id: &str) -> Result<Option<Session>, OAuthError> {
        let session = self.sessions.get(id).await?;
        Ok(session.filter(|s| s.extension_id == self.config.api_key().as_ref()))
    }

    /// Returns a platform client for `company_id`.
    ///
    /// Without an explicit `session` the company's offline session is used.
    /// An access token expiring within two minutes is refreshed first and the
    /// refreshed session is saved.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::SessionNotFound`] when the company has no offline
    ///   session
    /// - [`OAuthError::TokenExchangeFailed`] when the refresh is rejected
    /// - [`OAuthError::Storage`] / [`OAuthError::HttpError`] for lower-level
    ///   failures
    pub async fn get_platform_client(
        &self,
        company_id: &str,
        session: Option<Session>,
    ) -> Result<PlatformClient, OAuthError> {
        let tenant = Tenant::Company(company_id.to_string());
        let mut session = match session {
            Some(session) => session,
            None => self
                .load_session(&self.offline_session_id(&tenant))
                .await?
                .ok_or(OAuthError::SessionNotFound)?,
        };

        let now = Utc::now();
        if session.needs_refresh(now, Duration::seconds(REFRESH_WINDOW_SECS)) {
            if let Some(refresh_token) = session.refresh_token.clone() {
                tracing::debug!("Refreshing access token for company {company_id}");
                let token = self
                    .oauth
                    .refresh_access_token(&tenant, &refresh_token)
                    .await?;
                session.update_token(token, now);
                self.sessions.save(&session).await?;
            }
        }

        Ok(PlatformClient::new(
            Arc::clone(&self.config),
            company_id,
            session,
        )?)
    }
}

/// Builder for [`Extension`].
///
/// `config` and `callbacks` are required. Storage defaults to
/// [`MemoryStorage`] and the OAuth client to [`HttpOAuthClient`].
#[derive(Default)]
#[must_use]
pub struct ExtensionBuilder {
    config: Option<ExtensionConfig>,
    storage: Option<Arc<dyn StorageAdapter>>,
    oauth: Option<Arc<dyn PlatformOAuthClient>>,
    callbacks: Option<Arc<dyn ExtensionCallbacks>>,
    webhook_config: Option<WebhookConfig>,
}

impl fmt::Debug for ExtensionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionBuilder")
            .field("config", &self.config)
            .field("has_storage", &self.storage.is_some())
            .field("has_oauth", &self.oauth.is_some())
            .field("has_callbacks", &self.callbacks.is_some())
            .field("webhook_config", &self.webhook_config)
            .finish()
    }
}

impl ExtensionBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the extension configuration.
    pub fn config(mut self, config: ExtensionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the storage adapter sessions are persisted through.
    pub fn storage(mut self, storage: Arc<dyn StorageAdapter>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replaces the platform OAuth client.
    pub fn oauth_client(mut self, client: Arc<dyn PlatformOAuthClient>) -> Self {
        self.oauth = Some(client);
        self
    }

    /// Sets the integrator callbacks.
    pub fn callbacks(mut self, callbacks: Arc<dyn ExtensionCallbacks>) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    /// Declares the webhook events to subscribe to.
    pub fn webhook_config(mut self, config: WebhookConfig) -> Self {
        self.webhook_config = Some(config);
        self
    }

    /// Builds the extension, initializing the webhook registry if webhooks
    /// were declared.
    ///
    /// # Errors
    ///
    /// - [`ExtensionError::Config`] when `config` or `callbacks` is missing
    /// - [`ExtensionError::Webhook`] when the webhook declaration is invalid
    ///   or cannot be resolved against the event catalog
    /// - [`ExtensionError::Http`] when an HTTP client cannot be created
    pub async fn build(self) -> Result<Extension, ExtensionError> {
        let config = Arc::new(
            self.config
                .ok_or(ConfigError::MissingRequiredField { field: "config" })?,
        );
        let callbacks = self
            .callbacks
            .ok_or(ConfigError::MissingRequiredField { field: "callbacks" })?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let oauth: Arc<dyn PlatformOAuthClient> = match self.oauth {
            Some(oauth) => oauth,
            None => Arc::new(HttpOAuthClient::new(Arc::clone(&config))?),
        };

        let webhooks = match self.webhook_config {
            Some(webhook_config) => {
                let registry = WebhookRegistry::new(Arc::clone(&config))?;
                registry.initialize(webhook_config).await?;
                Some(Arc::new(registry))
            }
            None => None,
        };

        tracing::info!("Extension {} initialized", config.api_key());

        Ok(Extension {
            config,
            sessions: SessionStore::new(storage),
            oauth,
            callbacks,
            webhooks,
        })
    }
}
