//! Company-scoped platform client.
//!
//! A [`PlatformClient`] pairs an authorized [`Session`] with an
//! [`HttpClient`] bound to the platform cluster. It is what the webhook
//! registry uses to read and write subscriber configuration, and what
//! [`Extension::get_platform_client`](crate::Extension::get_platform_client)
//! hands to integrators.

use std::sync::Arc;

use crate::auth::Session;
use crate::clients::{ClientAuth, HttpClient, HttpError, HttpRequest, HttpResponse};
use crate::config::ExtensionConfig;

/// An authenticated client for one company.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    config: Arc<ExtensionConfig>,
    company_id: String,
    session: Session,
    http: HttpClient,
}

impl PlatformClient {
    /// Creates a client for `company_id` using the session's access token.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the HTTP client cannot be created.
    pub fn new(
        config: Arc<ExtensionConfig>,
        company_id: impl Into<String>,
        session: Session,
    ) -> Result<Self, HttpError> {
        let auth = session
            .access_token
            .clone()
            .map_or(ClientAuth::None, ClientAuth::Bearer);
        let http = HttpClient::new(config.cluster().as_ref(), auth, &config)?;
        Ok(Self {
            config,
            company_id: company_id.into(),
            session,
            http,
        })
    }

    /// Returns the company this client acts for.
    #[must_use]
    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    /// Returns the session backing this client.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the extension configuration.
    #[must_use]
    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    /// Sends `request` to the platform cluster.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on validation, network or non-2xx failures.
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.http.request(request).await
    }
}
