//! Token endpoint calls.
//!
//! All grants are form-encoded POSTs authenticated with HTTP basic auth
//! (API key and secret). A non-2xx answer becomes
//! [`OAuthError::TokenExchangeFailed`]; nothing here is retried.

use crate::auth::{AccessTokenResponse, AuthScopes, Tenant};
use crate::clients::{DataType, HttpClient, HttpError, HttpMethod, HttpRequest};

use super::begin_auth::oauth_base_path;
use super::OAuthError;

/// A token grant sent to the platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TokenGrant<'a> {
    /// Exchange an authorization code for an online token.
    AuthorizationCode {
        /// The code from the callback.
        code: &'a str,
    },
    /// Exchange an authorization code for an offline, refresh-capable token.
    Offline {
        /// The code from the callback.
        code: &'a str,
        /// Scopes the offline token should carry.
        scopes: &'a AuthScopes,
    },
    /// Trade a refresh token for a new access token.
    RefreshToken {
        /// The stored refresh token.
        refresh_token: &'a str,
    },
}

impl TokenGrant<'_> {
    const fn endpoint(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } | Self::RefreshToken { .. } => "token",
            Self::Offline { .. } => "offline-token",
        }
    }

    fn form(&self) -> serde_json::Value {
        match self {
            Self::AuthorizationCode { code } => serde_json::json!({
                "grant_type": "authorization_code",
                "code": code,
            }),
            Self::Offline { code, scopes } => serde_json::json!({
                "grant_type": "client_credentials",
                "code": code,
                "scope": scopes.to_string(),
            }),
            Self::RefreshToken { refresh_token } => serde_json::json!({
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
            }),
        }
    }
}

/// Sends `grant` to the token endpoint for `tenant`.
///
/// `http` must be bound to the cluster with basic credentials.
///
/// # Errors
///
/// - [`OAuthError::TokenExchangeFailed`] on a non-2xx answer or an
///   unparsable body
/// - [`OAuthError::HttpError`] on network failures
pub(crate) async fn request_token(
    http: &HttpClient,
    tenant: &Tenant,
    grant: &TokenGrant<'_>,
) -> Result<AccessTokenResponse, OAuthError> {
    let path = format!("{}/{}", oauth_base_path(tenant), grant.endpoint());
    let request = HttpRequest::builder(HttpMethod::Post, path)
        .body(grant.form())
        .body_type(DataType::Form)
        .build()
        .map_err(HttpError::from)?;

    let response = match http.request(request).await {
        Ok(response) => response,
        Err(HttpError::Response(e)) => {
            return Err(OAuthError::TokenExchangeFailed {
                status: e.code,
                message: e.message,
            });
        }
        Err(e) => return Err(e.into()),
    };

    response
        .json::<AccessTokenResponse>()
        .map_err(|e| OAuthError::TokenExchangeFailed {
            status: response.code,
            message: format!("Failed to parse token response: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_grant_uses_offline_endpoint() {
        let scopes: AuthScopes = "company/products".parse().unwrap();
        let grant = TokenGrant::Offline {
            code: "c",
            scopes: &scopes,
        };
        assert_eq!(grant.endpoint(), "offline-token");
        assert_eq!(grant.form()["scope"], "company/products");
    }

    #[test]
    fn test_refresh_grant_form() {
        let grant = TokenGrant::RefreshToken { refresh_token: "r" };
        assert_eq!(grant.endpoint(), "token");
        assert_eq!(grant.form()["grant_type"], "refresh_token");
        assert_eq!(grant.form()["refresh_token"], "r");
    }
}
