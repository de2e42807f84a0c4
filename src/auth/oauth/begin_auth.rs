//! Authorization URL construction.
//!
//! The install handler redirects the merchant to the platform consent
//! screen built here. Company tenants use the panel authentication service,
//! organization tenants the partner service.

use crate::auth::{AuthScopes, Tenant};
use crate::config::{AccessMode, ExtensionConfig};

use super::StateParam;

/// Parameters of one authorization round-trip.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest<'a> {
    /// Scopes requested from the merchant.
    pub scopes: &'a AuthScopes,
    /// Where the platform sends the merchant back to.
    pub redirect_uri: &'a str,
    /// CSRF nonce stored on the online session.
    pub state: &'a StateParam,
    /// Requested access mode.
    pub access_mode: AccessMode,
}

/// Returns the base path of the OAuth service for `tenant`.
pub(crate) fn oauth_base_path(tenant: &Tenant) -> String {
    match tenant {
        Tenant::Company(id) => format!(
            "/service/panel/authentication/v1.0/company/{}/oauth",
            urlencoding::encode(id)
        ),
        Tenant::Organization(id) => format!(
            "/service/partner/authentication/v1.0/organization/{}/oauth",
            urlencoding::encode(id)
        ),
    }
}

/// Builds the platform authorization URL for `tenant`.
///
/// # Example
///
/// ```rust
/// use fdk_extension::{ApiKey, ApiSecretKey, AccessMode, ExtensionConfig, HostUrl, Tenant};
/// use fdk_extension::auth::oauth::{authorization_url, AuthorizationRequest, StateParam};
///
/// let config = ExtensionConfig::builder()
///     .api_key(ApiKey::new("my-key").unwrap())
///     .api_secret_key(ApiSecretKey::new("secret").unwrap())
///     .base_url(HostUrl::new("https://myext.example.com").unwrap())
///     .scopes("company/products".parse().unwrap())
///     .build()
///     .unwrap();
///
/// let state = StateParam::from_raw("nonce");
/// let redirect_uri = config.callback_url();
/// let url = authorization_url(
///     &config,
///     &Tenant::Company("1".to_string()),
///     &AuthorizationRequest {
///         scopes: config.scopes(),
///         redirect_uri: &redirect_uri,
///         state: &state,
///         access_mode: AccessMode::Online,
///     },
/// );
///
/// assert!(url.starts_with(
///     "https://api.fynd.com/service/panel/authentication/v1.0/company/1/oauth/authorize?"
/// ));
/// assert!(url.contains("state=nonce"));
/// ```
#[must_use]
pub fn authorization_url(
    config: &ExtensionConfig,
    tenant: &Tenant,
    request: &AuthorizationRequest<'_>,
) -> String {
    let params = [
        ("client_id", config.api_key().as_ref().to_string()),
        ("scope", request.scopes.to_string()),
        ("redirect_uri", request.redirect_uri.to_string()),
        ("state", request.state.to_string()),
        ("access_mode", request.access_mode.as_str().to_string()),
        ("response_type", "code".to_string()),
    ];

    let query_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}{}/authorize?{}",
        config.cluster(),
        oauth_base_path(tenant),
        query_string
    )
}
