//! Install, auth, auto-install and uninstall flows.
//!
//! A browser install walks `install` (online session with a fresh state
//! nonce, redirect to the consent screen) and then `auth` (state check,
//! token exchange, optional offline exchange, webhook sync). `auto_install`
//! performs the offline exchange server-to-server. `uninstall` only accepts
//! requests carrying a valid platform signature.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::auth::oauth::{AuthorizationRequest, OAuthError, StateParam};
use crate::auth::{Session, SessionIdKind, Tenant};
use crate::clients::PlatformClient;
use crate::config::AccessMode;
use crate::signature::verify_request;

use super::callbacks::{CallbackContext, CallbackError};
use super::cookie::{unsign_cookie, SetCookie};
use super::request::{ExtensionRequest, HandlerResponse};
use super::Extension;

/// Lifetime of an online session awaiting its auth callback.
const PENDING_AUTHORIZATION_MINUTES: i64 = 15;

fn resolve_tenant(
    company_id: Option<String>,
    organization_id: Option<String>,
) -> Result<Tenant, OAuthError> {
    let present = |id: &Option<String>| id.as_deref().is_some_and(|id| !id.is_empty());
    if present(&company_id) {
        company_id.map(Tenant::Company).ok_or(OAuthError::MissingTenant)
    } else if present(&organization_id) {
        organization_id
            .map(Tenant::Organization)
            .ok_or(OAuthError::MissingTenant)
    } else {
        Err(OAuthError::MissingTenant)
    }
}

fn query_tenant(request: &ExtensionRequest) -> Result<Tenant, OAuthError> {
    resolve_tenant(
        request.query_value("company_id").map(str::to_string),
        request.query_value("organization_id").map(str::to_string),
    )
}

fn body_tenant(request: &ExtensionRequest) -> Result<Tenant, OAuthError> {
    resolve_tenant(
        request.body_value("company_id"),
        request.body_value("organization_id"),
    )
}

fn tenant_header(tenant: &Tenant) -> (String, String) {
    let name = match tenant {
        Tenant::Company(_) => "x-company-id",
        Tenant::Organization(_) => "x-organization-id",
    };
    (name.to_string(), tenant.id().to_string())
}

fn callback_failed(error: &CallbackError) -> OAuthError {
    OAuthError::Callback {
        message: error.to_string(),
    }
}

fn success() -> HandlerResponse {
    HandlerResponse::Json {
        status: 200,
        body: json!({ "success": true }),
    }
}

impl Extension {
    /// Starts a browser install.
    ///
    /// Creates an online session holding a fresh state nonce, valid for 15
    /// minutes, and redirects to the platform consent screen. The session id
    /// travels in a signed cookie named after the tenant. A `redirect_path`
    /// query parameter is kept on the session and wins over the `auth`
    /// callback's URL once authorization completes.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::MissingTenant`] without `company_id` or
    ///   `organization_id`
    /// - [`OAuthError::Storage`] when the session cannot be saved
    pub async fn install(&self, request: &ExtensionRequest) -> Result<HandlerResponse, OAuthError> {
        let tenant = query_tenant(request)?;
        let now = Utc::now();
        let state = StateParam::new();

        let mut session = Session::new(
            Session::generate_id(&SessionIdKind::Online),
            &tenant,
            AccessMode::Online,
            self.config.api_key().as_ref().to_string(),
        );
        session.state = state.as_ref().to_string();
        session.scope = self.config.scopes().clone();
        session.expires = Some(now + Duration::minutes(PENDING_AUTHORIZATION_MINUTES));
        session.redirect_path = request
            .query_value("redirect_path")
            .filter(|path| !path.is_empty())
            .map(str::to_string);
        self.sessions.save(&session).await?;

        let mut redirect_uri = self.config.callback_url();
        if let Some(application_id) = request.query_value("application_id") {
            redirect_uri.push_str("?application_id=");
            redirect_uri.push_str(&urlencoding::encode(application_id));
        }

        let location = self.oauth.start_authorization(
            &tenant,
            &AuthorizationRequest {
                scopes: self.config.scopes(),
                redirect_uri: &redirect_uri,
                state: &state,
                access_mode: self.config.access_mode(),
            },
        );

        tracing::info!("Starting authorization for {tenant}");

        Ok(HandlerResponse::Redirect {
            location,
            cookies: vec![self.session_cookie(&tenant, &session)],
            headers: vec![tenant_header(&tenant)],
        })
    }

    /// Completes a browser install from the platform's OAuth callback.
    ///
    /// The `state` query parameter is compared with the session's nonce
    /// before any token exchange. In offline mode the tenant's deterministic
    /// offline session is exchanged and saved as well. When the webhook
    /// registry subscribes on install, a detached sync is started whose
    /// failures are only logged.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::SessionNotFound`] when the cookie is missing, forged,
    ///   or names an unknown session
    /// - [`OAuthError::InvalidOAuth`] on a state mismatch
    /// - [`OAuthError::InvalidCallback`] without a `code`
    /// - [`OAuthError::TokenExchangeFailed`] when the platform rejects the
    ///   code
    /// - [`OAuthError::Callback`] when the `auth` callback fails
    pub async fn auth(&self, request: &ExtensionRequest) -> Result<HandlerResponse, OAuthError> {
        let tenant = query_tenant(request)?;
        let session_id = request
            .cookie(&tenant.cookie_name())
            .and_then(|cookie| unsign_cookie(cookie, self.config.api_secret_key().as_ref()))
            .ok_or(OAuthError::SessionNotFound)?;
        let mut session = self
            .load_session(&session_id)
            .await?
            .ok_or(OAuthError::SessionNotFound)?;

        let received_state = request.query_value("state").unwrap_or_default();
        if !StateParam::from_raw(session.state.clone()).matches(received_state) {
            tracing::warn!("OAuth state mismatch for {tenant}");
            return Err(OAuthError::InvalidOAuth);
        }

        let code = request
            .query_value("code")
            .filter(|code| !code.is_empty())
            .ok_or_else(|| OAuthError::InvalidCallback {
                reason: "missing `code` query parameter".to_string(),
            })?;

        let now = Utc::now();
        let token = self.oauth.verify_callback(&tenant, code).await?;
        session.update_token(token, now);
        if let Some(expires_in) = session.expires_in {
            session.expires = Some(now + Duration::seconds(expires_in));
        }
        self.sessions.save(&session).await?;

        let sync_session = if self.config.access_mode() == AccessMode::Offline {
            self.exchange_offline(&tenant, code, now).await?
        } else {
            session.clone()
        };
        self.spawn_webhook_sync(&tenant, sync_session);

        let ctx = CallbackContext {
            request: request.clone(),
            tenant: tenant.clone(),
            session: Some(session.clone()),
        };
        let callback_location = self
            .callbacks
            .auth(&ctx)
            .await
            .map_err(|e| callback_failed(&e))?;
        let location = session.redirect_path.clone().unwrap_or(callback_location);

        tracing::info!("Authorization completed for {tenant}");

        Ok(HandlerResponse::Redirect {
            location,
            cookies: vec![self.session_cookie(&tenant, &session)],
            headers: vec![tenant_header(&tenant)],
        })
    }

    /// Installs server-to-server.
    ///
    /// The JSON body carries `company_id` (or `organization_id`) and `code`.
    /// The code is exchanged for an offline token which is saved under the
    /// deterministic session id whatever the configured access mode.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::MissingTenant`] / [`OAuthError::InvalidCallback`] for
    ///   an incomplete body
    /// - [`OAuthError::TokenExchangeFailed`] when the platform rejects the
    ///   code
    /// - [`OAuthError::Callback`] when the `auto_install` callback fails
    pub async fn auto_install(
        &self,
        request: &ExtensionRequest,
    ) -> Result<HandlerResponse, OAuthError> {
        let tenant = body_tenant(request)?;
        let code = request
            .body_value("code")
            .filter(|code| !code.is_empty())
            .ok_or_else(|| OAuthError::InvalidCallback {
                reason: "missing `code` in request body".to_string(),
            })?;

        let session = self.exchange_offline(&tenant, &code, Utc::now()).await?;
        self.spawn_webhook_sync(&tenant, session.clone());

        let ctx = CallbackContext {
            request: request.clone(),
            tenant: tenant.clone(),
            session: Some(session),
        };
        self.callbacks
            .auto_install(&ctx)
            .await
            .map_err(|e| callback_failed(&e))?;

        tracing::info!("Auto install completed for {tenant}");
        Ok(success())
    }

    /// Handles the platform's uninstall notification.
    ///
    /// The request signature is verified first. In offline mode the tenant's
    /// offline session is deleted. Webhook subscribers are left untouched.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::Signature`] when the request is unsigned, forged or
    ///   stale
    /// - [`OAuthError::MissingTenant`] when the body names no tenant
    /// - [`OAuthError::Callback`] when the `uninstall` callback fails
    pub async fn uninstall(
        &self,
        request: &ExtensionRequest,
    ) -> Result<HandlerResponse, OAuthError> {
        verify_request(
            &request.to_signable(),
            self.config.api_secret_key().as_ref(),
            Utc::now(),
        )?;
        let tenant = body_tenant(request)?;

        if self.config.access_mode() == AccessMode::Offline {
            self.sessions.delete(&self.offline_session_id(&tenant)).await?;
        }

        let ctx = CallbackContext {
            request: request.clone(),
            tenant: tenant.clone(),
            session: None,
        };
        self.callbacks
            .uninstall(&ctx)
            .await
            .map_err(|e| callback_failed(&e))?;

        tracing::info!("Extension uninstalled for {tenant}");
        Ok(success())
    }

    async fn exchange_offline(
        &self,
        tenant: &Tenant,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, OAuthError> {
        let id = self.offline_session_id(tenant);
        let mut session = match self.load_session(&id).await? {
            Some(session) => session,
            None => Session::new(
                id,
                tenant,
                AccessMode::Offline,
                self.config.api_key().as_ref().to_string(),
            ),
        };

        let token = self
            .oauth
            .get_offline_access_token(tenant, self.config.scopes(), code)
            .await?;
        session.update_token(token, now);
        session.expires = None;
        self.sessions.save(&session).await?;
        Ok(session)
    }

    fn spawn_webhook_sync(&self, tenant: &Tenant, session: Session) {
        let (Some(registry), Tenant::Company(company_id)) = (self.webhooks.clone(), tenant) else {
            return;
        };
        let config = Arc::clone(&self.config);
        let company_id = company_id.clone();

        tokio::spawn(async move {
            if !registry.is_initialized().await || !registry.subscribe_on_install().await {
                return;
            }
            let client = match PlatformClient::new(config, company_id.clone(), session) {
                Ok(client) => client,
                Err(error) => {
                    tracing::error!("Webhook sync for company {company_id} failed: {error}");
                    return;
                }
            };
            if let Err(error) = registry.sync_events(&client, None, Some(true)).await {
                tracing::error!("Webhook sync for company {company_id} failed: {error}");
            }
        });
    }

    fn session_cookie(&self, tenant: &Tenant, session: &Session) -> SetCookie {
        SetCookie::signed(
            tenant.cookie_name(),
            &session.id,
            self.config.api_secret_key().as_ref(),
            session.expires,
        )
    }
}
