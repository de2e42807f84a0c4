//! Signed-header request scheme.
//!
//! Platform calls into the extension (uninstall, proxied requests and
//! current-protocol webhook deliveries) carry an `x-fp-date` timestamp and
//! an `x-fp-signature` header. The signature is an HMAC-SHA256, keyed with
//! the extension's API secret, over a canonical form of the request:
//!
//! ```text
//! METHOD
//! /path
//! a=1&b=2                      (query, sorted)
//! host:myext.example.com
//! x-fp-date:20240101T000000Z   (signed headers present, sorted by name)
//!
//! host;x-fp-date
//! sha256hex(body)
//! ```
//!
//! The string signed is `"{x-fp-date}\n{sha256hex(canonical request)}"` and
//! the header value is the hex digest prefixed with `v1.1:`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use super::hmac::{compute_signature, constant_time_compare, sha256_hex};
use super::SignatureError;

/// Header carrying the signing timestamp.
pub const HEADER_DATE: &str = "x-fp-date";

/// Header carrying the signature.
pub const HEADER_SIGNATURE: &str = "x-fp-signature";

/// Prefix identifying the signed-header scheme version.
pub const SIGNATURE_VERSION_PREFIX: &str = "v1.1:";

/// Timestamp format of the `x-fp-date` header.
pub const DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Maximum distance, in seconds, between `x-fp-date` and the current time.
pub const MAX_CLOCK_SKEW_SECS: i64 = 5 * 60;

/// Headers included in the signature when present.
const SIGNED_HEADERS: [&str; 5] = [
    "x-user-data",
    HEADER_DATE,
    "host",
    "x-application-data",
    "x-fp-sdk-version",
];

/// A request in the shape needed to compute or check its signature.
///
/// Header names are stored lowercased.
///
/// # Example
///
/// ```rust
/// use fdk_extension::signature::{sign_request, verify_request, SignableRequest};
/// use serde_json::json;
///
/// let mut request = SignableRequest::new("POST", "myext.example.com", "/fp/uninstall?x=1")
///     .header("Content-Type", "application/json")
///     .body(json!({"company_id": 1}));
///
/// let now = chrono::Utc::now();
/// sign_request(&mut request, "secret", now);
/// assert!(verify_request(&request, "secret", now).is_ok());
/// assert!(verify_request(&request, "other", now).is_err());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignableRequest {
    /// HTTP method, uppercased.
    pub method: String,
    /// Host (authority) the request was sent to.
    pub host: String,
    /// Path, optionally followed by `?query`.
    pub path: String,
    /// Request headers keyed by lowercase name.
    pub headers: BTreeMap<String, String>,
    /// Parsed request body, if any.
    pub body: Option<Value>,
}

impl SignableRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: &str, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            host: host.into(),
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Adds a header; the name is lowercased.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns a header value by lowercase name.
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn split_path(&self) -> (&str, &str) {
        self.path.split_once('?').unwrap_or((self.path.as_str(), ""))
    }

    /// Returns the canonical request string.
    #[must_use]
    pub fn canonical_request(&self) -> String {
        let (path, query) = self.split_path();
        let path = if path.is_empty() { "/" } else { path };

        let mut signed: BTreeMap<&str, &str> = BTreeMap::new();
        for name in SIGNED_HEADERS {
            let value = if name == "host" {
                self.header_value("host").or(Some(self.host.as_str()))
            } else {
                self.header_value(name)
            };
            if let Some(value) = value {
                signed.insert(name, value.trim());
            }
        }

        let mut out = String::new();
        out.push_str(&self.method);
        out.push('\n');
        out.push_str(path);
        out.push('\n');
        out.push_str(&canonical_query(&parse_query(query)));
        out.push('\n');
        for (name, value) in &signed {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&signed.keys().copied().collect::<Vec<_>>().join(";"));
        out.push('\n');
        out.push_str(&sha256_hex(self.body_string().as_bytes()));
        out
    }

    /// Encodes the body according to its content type.
    fn body_string(&self) -> String {
        let Some(body) = &self.body else {
            return String::new();
        };
        let content_type = self.header_value("content-type").unwrap_or_default();

        if content_type.starts_with("application/json") {
            body.to_string()
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            match body {
                Value::Object(map) => {
                    let pairs: Vec<(String, String)> = map
                        .iter()
                        .map(|(k, v)| (k.clone(), value_to_plain_string(v)))
                        .collect();
                    canonical_query(&pairs)
                }
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        } else {
            match body {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }
        }
    }

    fn string_to_sign(&self, date: &str) -> String {
        format!("{date}\n{}", sha256_hex(self.canonical_request().as_bytes()))
    }
}

fn value_to_plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(component: &str) -> String {
    let component = component.replace('+', " ");
    urlencoding::decode(&component).map_or(component.clone(), |s| s.into_owned())
}

/// Encodes `pairs` as a query string sorted by key, then value.
#[must_use]
pub fn canonical_query(pairs: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Signs `request` with `secret` at `now`.
///
/// Sets the `x-fp-date` and `x-fp-signature` headers (and `host`, when
/// absent) and returns the signature header value.
pub fn sign_request(request: &mut SignableRequest, secret: &str, now: DateTime<Utc>) -> String {
    let date = now.format(DATE_FORMAT).to_string();
    let host = request.host.clone();
    request.headers.entry("host".to_string()).or_insert(host);
    request.headers.insert(HEADER_DATE.to_string(), date.clone());

    let signature = format!(
        "{SIGNATURE_VERSION_PREFIX}{}",
        compute_signature(&request.string_to_sign(&date), secret)
    );
    request
        .headers
        .insert(HEADER_SIGNATURE.to_string(), signature.clone());
    signature
}

/// Verifies the signature and freshness of `request`.
///
/// Freshness is checked first: a missing or unparsable `x-fp-date`, or one
/// more than five minutes away from `now`, fails with
/// [`SignatureError::RequestExpired`].
///
/// # Errors
///
/// Returns [`SignatureError::RequestExpired`] for stale requests and
/// [`SignatureError::InvalidSignature`] when the signature is missing or
/// does not match.
pub fn verify_request(
    request: &SignableRequest,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    let date = request
        .header_value(HEADER_DATE)
        .ok_or(SignatureError::RequestExpired)?;
    let signed_at = NaiveDateTime::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| SignatureError::RequestExpired)?
        .and_utc();
    if (now - signed_at).num_seconds().abs() > MAX_CLOCK_SKEW_SECS {
        return Err(SignatureError::RequestExpired);
    }

    let provided = request
        .header_value(HEADER_SIGNATURE)
        .ok_or(SignatureError::InvalidSignature)?;
    let expected = format!(
        "{SIGNATURE_VERSION_PREFIX}{}",
        compute_signature(&request.string_to_sign(date), secret)
    );

    if constant_time_compare(provided, &expected) {
        Ok(())
    } else {
        Err(SignatureError::InvalidSignature)
    }
}
