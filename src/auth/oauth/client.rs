//! The platform OAuth collaborator.
//!
//! Handlers only talk to the platform's OAuth service through
//! [`PlatformOAuthClient`], so tests and integrators can substitute their
//! own implementation. [`HttpOAuthClient`] is the reqwest-backed default.

use std::sync::Arc;

use crate::auth::{AccessTokenResponse, AuthScopes, Tenant};
use crate::clients::{ClientAuth, HttpClient, HttpError};
use crate::config::ExtensionConfig;
use crate::BoxFuture;

use super::begin_auth::{authorization_url, AuthorizationRequest};
use super::token::{request_token, TokenGrant};
use super::OAuthError;

/// Operations the extension needs from the platform OAuth service.
pub trait PlatformOAuthClient: Send + Sync {
    /// Builds the URL the merchant is redirected to for consent.
    fn start_authorization(&self, tenant: &Tenant, request: &AuthorizationRequest<'_>) -> String;

    /// Exchanges the callback `code` for an access token.
    fn verify_callback<'a>(
        &'a self,
        tenant: &'a Tenant,
        code: &'a str,
    ) -> BoxFuture<'a, Result<AccessTokenResponse, OAuthError>>;

    /// Exchanges `code` for an offline, refresh-capable token.
    fn get_offline_access_token<'a>(
        &'a self,
        tenant: &'a Tenant,
        scopes: &'a AuthScopes,
        code: &'a str,
    ) -> BoxFuture<'a, Result<AccessTokenResponse, OAuthError>>;

    /// Trades a refresh token for a new access token.
    fn refresh_access_token<'a>(
        &'a self,
        tenant: &'a Tenant,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<AccessTokenResponse, OAuthError>>;
}

/// [`PlatformOAuthClient`] backed by the platform token endpoints.
#[derive(Debug, Clone)]
pub struct HttpOAuthClient {
    config: Arc<ExtensionConfig>,
    http: HttpClient,
}

// Verify HttpOAuthClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpOAuthClient>();
};

impl HttpOAuthClient {
    /// Creates a client for the configured cluster, authenticating with the
    /// API key and secret.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the HTTP client cannot be created.
    pub fn new(config: Arc<ExtensionConfig>) -> Result<Self, HttpError> {
        let auth = ClientAuth::Basic {
            username: config.api_key().as_ref().to_string(),
            password: config.api_secret_key().as_ref().to_string(),
        };
        let http = HttpClient::new(config.cluster().as_ref(), auth, &config)?;
        Ok(Self { config, http })
    }
}

impl PlatformOAuthClient for HttpOAuthClient {
    fn start_authorization(&self, tenant: &Tenant, request: &AuthorizationRequest<'_>) -> String {
        authorization_url(&self.config, tenant, request)
    }

    fn verify_callback<'a>(
        &'a self,
        tenant: &'a Tenant,
        code: &'a str,
    ) -> BoxFuture<'a, Result<AccessTokenResponse, OAuthError>> {
        Box::pin(async move {
            request_token(&self.http, tenant, &TokenGrant::AuthorizationCode { code }).await
        })
    }

    fn get_offline_access_token<'a>(
        &'a self,
        tenant: &'a Tenant,
        scopes: &'a AuthScopes,
        code: &'a str,
    ) -> BoxFuture<'a, Result<AccessTokenResponse, OAuthError>> {
        Box::pin(async move {
            request_token(&self.http, tenant, &TokenGrant::Offline { code, scopes }).await
        })
    }

    fn refresh_access_token<'a>(
        &'a self,
        tenant: &'a Tenant,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<AccessTokenResponse, OAuthError>> {
        Box::pin(async move {
            request_token(
                &self.http,
                tenant,
                &TokenGrant::RefreshToken { refresh_token },
            )
            .await
        })
    }
}
