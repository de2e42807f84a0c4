//! HTTP client for platform API communication.
//!
//! This module provides the [`HttpClient`] type for making authenticated
//! requests to the platform. The client sends each request once; transient
//! failures are retried by the caller through
//! [`RetryManager`](crate::RetryManager).

use std::collections::HashMap;
use std::fmt;

use crate::clients::errors::{HttpError, HttpResponseError};
use crate::clients::http_request::{HttpMethod, HttpRequest};
use crate::clients::http_response::HttpResponse;
use crate::config::ExtensionConfig;

/// SDK version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Credentials attached to every request sent by an [`HttpClient`].
#[derive(Clone, PartialEq, Eq)]
pub enum ClientAuth {
    /// No `Authorization` header.
    None,
    /// `Authorization: Bearer {token}`.
    Bearer(String),
    /// HTTP basic authentication, used by the token endpoints.
    Basic {
        /// The user name (the extension API key).
        username: String,
        /// The password (the extension API secret).
        password: String,
    },
}

impl fmt::Debug for ClientAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(*****)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"*****")
                .finish(),
        }
    }
}

/// HTTP client for making requests to the platform.
///
/// The client handles:
/// - URL construction from a base URI
/// - Default headers including User-Agent
/// - Bearer or basic authentication
/// - Error body serialization
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,ignore
/// use fdk_extension::clients::{ClientAuth, HttpClient, HttpRequest, HttpMethod};
///
/// let client = HttpClient::new(
///     config.cluster().as_ref(),
///     ClientAuth::Bearer("access-token".to_string()),
///     &config,
/// )?;
///
/// let request = HttpRequest::builder(HttpMethod::Get, "/service/platform/webhook/v2.0/company/1/subscriber")
///     .build()
///     .unwrap();
///
/// let response = client.request(request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    /// The internal reqwest HTTP client.
    client: reqwest::Client,
    /// Base URI (e.g., `https://api.fynd.com`).
    base_uri: String,
    /// Credentials sent with every request.
    auth: ClientAuth,
    /// Default headers to include in all requests.
    default_headers: HashMap<String, String>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new HTTP client for `base_uri`.
    ///
    /// The request timeout and User-Agent are taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the underlying reqwest client cannot
    /// be created (e.g., TLS initialization failure).
    pub fn new(
        base_uri: impl Into<String>,
        auth: ClientAuth,
        config: &ExtensionConfig,
    ) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.request_timeout())
            .build()?;

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), config.user_agent());
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        Ok(Self {
            client,
            base_uri: base_uri.into().trim_end_matches('/').to_string(),
            auth,
            default_headers,
        })
    }

    /// Returns the base URI for this client.
    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns the credentials sent with every request.
    #[must_use]
    pub const fn auth(&self) -> &ClientAuth {
        &self.auth
    }

    /// Sends an HTTP request to the platform.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - Request validation fails (`InvalidRequest`)
    /// - Network error or timeout occurs (`Network`)
    /// - Non-2xx response received (`Response`)
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let url = format!(
            "{}/{}",
            self.base_uri,
            request.path.trim_start_matches('/')
        );

        let mut headers = self.default_headers.clone();
        if let Some(body_type) = &request.body_type {
            headers.insert(
                "Content-Type".to_string(),
                body_type.as_content_type().to_string(),
            );
        }
        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                headers.insert(key.clone(), value.clone());
            }
        }

        let mut req_builder = match request.http_method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };

        for (key, value) in &headers {
            req_builder = req_builder.header(key, value);
        }

        req_builder = match &self.auth {
            ClientAuth::None => req_builder,
            ClientAuth::Bearer(token) => req_builder.bearer_auth(token),
            ClientAuth::Basic { username, password } => {
                req_builder.basic_auth(username, Some(password))
            }
        };

        if let Some(query) = &request.query {
            req_builder = req_builder.query(query);
        }

        if let (Some(body), Some(body_type)) = (&request.body, &request.body_type) {
            req_builder = req_builder.body(body_type.encode(body));
        }

        let res = req_builder.send().await?;

        let code = res.status().as_u16();
        let res_headers = Self::parse_response_headers(res.headers());
        let body_text = res.text().await.unwrap_or_default();

        let body = if body_text.is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(&body_text)
                .unwrap_or_else(|_| serde_json::json!({ "raw_body": body_text }))
        };

        let response = HttpResponse::new(code, res_headers, body);

        if response.is_ok() {
            return Ok(response);
        }

        tracing::debug!(
            "Platform request {} {} failed with status {}",
            request.http_method,
            request.path,
            code
        );

        Err(HttpError::Response(HttpResponseError {
            code,
            message: Self::serialize_error(&response),
            error_reference: response.request_id().map(String::from),
        }))
    }

    /// Parses response headers into a `HashMap`.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }

    /// Serializes an error response body to a compact JSON message.
    fn serialize_error(response: &HttpResponse) -> String {
        let mut error_body = serde_json::Map::new();

        for field in ["message", "errors", "error", "error_description", "raw_body"] {
            if let Some(value) = response.body.get(field) {
                error_body.insert(field.to_string(), value.clone());
            }
        }

        if let Some(request_id) = response.request_id() {
            error_body.insert(
                "error_reference".to_string(),
                serde_json::json!(format!(
                    "If you report this error, please include this id: {request_id}."
                )),
            );
        }

        serde_json::to_string(&error_body).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiKey, ApiSecretKey, HostUrl};

    fn config() -> ExtensionConfig {
        ExtensionConfig::builder()
            .api_key(ApiKey::new("key").unwrap())
            .api_secret_key(ApiSecretKey::new("secret").unwrap())
            .base_url(HostUrl::new("https://myext.example.com").unwrap())
            .user_agent_prefix("MyExt/1.0")
            .build()
            .unwrap()
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = HttpClient::new("https://api.fynd.com/", ClientAuth::None, &config()).unwrap();
        assert_eq!(client.base_uri(), "https://api.fynd.com");
    }

    #[test]
    fn test_user_agent_header_uses_config() {
        let client = HttpClient::new("https://api.fynd.com", ClientAuth::None, &config()).unwrap();
        let user_agent = client.default_headers().get("User-Agent").unwrap();
        assert!(user_agent.starts_with("MyExt/1.0 | fdk-extension-rust/"));
    }

    #[test]
    fn test_auth_debug_masks_secrets() {
        let bearer = format!("{:?}", ClientAuth::Bearer("tok".to_string()));
        assert_eq!(bearer, "Bearer(*****)");

        let basic = format!(
            "{:?}",
            ClientAuth::Basic {
                username: "key".to_string(),
                password: "secret".to_string(),
            }
        );
        assert!(basic.contains("key"));
        assert!(!basic.contains("secret"));
    }

    #[test]
    fn test_serialize_error_includes_request_id() {
        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), vec!["req-1".to_string()]);
        let response = HttpResponse::new(
            400,
            headers,
            serde_json::json!({"message": "bad", "ignored": true}),
        );
        let message = HttpClient::serialize_error(&response);
        assert!(message.contains("\"message\":\"bad\""));
        assert!(message.contains("req-1"));
        assert!(!message.contains("ignored"));
    }
}
