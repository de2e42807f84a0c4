//! Framework-agnostic request and response types for the handlers.
//!
//! Server adapters translate their native request into an
//! [`ExtensionRequest`] and map the returned [`HandlerResponse`] back.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::signature::{canonical_query, SignableRequest};

use super::cookie::{parse_cookie_header, SetCookie};

/// An inbound request to one of the extension handlers.
///
/// # Example
///
/// ```rust
/// use fdk_extension::extension::ExtensionRequest;
///
/// let request = ExtensionRequest::new("GET", "myext.example.com", "/fp/install")
///     .query("company_id", "1")
///     .header("Cookie", "ext_session_1=abc");
///
/// assert_eq!(request.query_value("company_id"), Some("1"));
/// assert_eq!(request.cookie("ext_session_1"), Some("abc"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct ExtensionRequest {
    /// HTTP method.
    pub method: String,
    /// Host the request was sent to.
    pub host: String,
    /// Path without the query string.
    pub path: String,
    /// Query parameters, in arrival order.
    pub query: Vec<(String, String)>,
    /// Headers keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    /// Request cookies.
    pub cookies: HashMap<String, String>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl ExtensionRequest {
    /// Creates a request without query, headers or body.
    #[must_use]
    pub fn new(method: &str, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            host: host.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Adds a header. A `Cookie` header also populates [`cookies`](Self::cookies).
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == "cookie" {
            self.cookies.extend(parse_cookie_header(&value));
        }
        self.headers.insert(name, value);
        self
    }

    /// Adds a cookie.
    #[must_use]
    pub fn cookie_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the first value of a query parameter.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns a cookie value.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns a string or numeric field of the JSON body.
    #[must_use]
    pub fn body_value(&self, name: &str) -> Option<String> {
        match self.body.as_ref()?.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns the signed-header view of this request.
    #[must_use]
    pub fn to_signable(&self) -> SignableRequest {
        let path = if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, canonical_query(&self.query))
        };
        let mut request = SignableRequest::new(&self.method, self.host.clone(), path);
        request.headers.clone_from(&self.headers);
        request.body.clone_from(&self.body);
        request
    }
}

/// What a handler asks the server to send back.
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerResponse {
    /// `302 Found` to `location`.
    Redirect {
        /// Redirect target.
        location: String,
        /// Cookies to set.
        cookies: Vec<SetCookie>,
        /// Extra response headers.
        headers: Vec<(String, String)>,
    },
    /// A JSON response.
    Json {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: Value,
    },
}

impl HandlerResponse {
    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Redirect { .. } => 302,
            Self::Json { status, .. } => *status,
        }
    }

    /// Returns the redirect target, for redirects.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Redirect { location, .. } => Some(location),
            Self::Json { .. } => None,
        }
    }

    /// Returns the cookies to set.
    #[must_use]
    pub fn cookies(&self) -> &[SetCookie] {
        match self {
            Self::Redirect { cookies, .. } => cookies,
            Self::Json { .. } => &[],
        }
    }
}
