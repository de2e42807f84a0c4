//! Signed session cookies.
//!
//! Cookie values are signed as `s:{value}.{signature}`, where the signature
//! is the unpadded base64 HMAC-SHA256 of the value keyed with the API
//! secret. A cookie whose signature does not verify reads as absent.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::signature::hmac::{compute_signature_base64, constant_time_compare};

const SIGNED_PREFIX: &str = "s:";
const EXPIRES_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Signs `value` with `secret`.
///
/// ```rust
/// use fdk_extension::extension::{sign_cookie, unsign_cookie};
///
/// let signed = sign_cookie("session-id", "secret");
/// assert!(signed.starts_with("s:session-id."));
/// assert_eq!(unsign_cookie(&signed, "secret").as_deref(), Some("session-id"));
/// assert_eq!(unsign_cookie(&signed, "other"), None);
/// ```
#[must_use]
pub fn sign_cookie(value: &str, secret: &str) -> String {
    format!(
        "{SIGNED_PREFIX}{value}.{}",
        compute_signature_base64(value.as_bytes(), secret)
    )
}

/// Returns the original value of a signed cookie, or `None` when the
/// cookie is unsigned or its signature does not match.
#[must_use]
pub fn unsign_cookie(signed: &str, secret: &str) -> Option<String> {
    let rest = signed.strip_prefix(SIGNED_PREFIX)?;
    let (value, signature) = rest.rsplit_once('.')?;
    let expected = compute_signature_base64(value.as_bytes(), secret);
    constant_time_compare(signature, &expected).then(|| value.to_string())
}

/// Parses a `Cookie` request header into name/value pairs.
///
/// Values are percent-decoded. Malformed pairs are skipped.
#[must_use]
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let value = value.trim().trim_matches('"');
            let value = urlencoding::decode(value).map_or_else(|_| value.to_string(), |v| v.into_owned());
            Some((name.trim().to_string(), value))
        })
        .collect()
}

/// A cookie to be set on the response.
#[derive(Clone, PartialEq, Eq)]
pub struct SetCookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value, already signed.
    pub value: String,
    /// Absolute expiry; a session cookie when `None`.
    pub expires: Option<DateTime<Utc>>,
}

impl SetCookie {
    /// Creates a cookie holding `value` signed with `secret`.
    #[must_use]
    pub fn signed(
        name: impl Into<String>,
        value: &str,
        secret: &str,
        expires: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            name: name.into(),
            value: sign_cookie(value, secret),
            expires,
        }
    }

    /// Renders the `Set-Cookie` header value.
    ///
    /// Cookies are `HttpOnly`, `Secure` and `SameSite=None`, since the
    /// extension runs inside the platform's iframe.
    #[must_use]
    pub fn header_value(&self) -> String {
        let mut out = format!(
            "{}={}; Path=/",
            self.name,
            urlencoding::encode(&self.value)
        );
        if let Some(expires) = self.expires {
            out.push_str("; Expires=");
            out.push_str(&expires.format(EXPIRES_FORMAT).to_string());
        }
        out.push_str("; HttpOnly; Secure; SameSite=None");
        out
    }
}

impl fmt::Debug for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetCookie")
            .field("name", &self.name)
            .field("value", &"*****")
            .field("expires", &self.expires)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tampered_value_is_rejected() {
        let signed = sign_cookie("abc", "secret");
        let tampered = signed.replacen("abc", "abd", 1);
        assert_eq!(unsign_cookie(&tampered, "secret"), None);
    }

    #[test]
    fn test_unsigned_value_is_rejected() {
        assert_eq!(unsign_cookie("abc", "secret"), None);
    }

    #[test]
    fn test_value_containing_dots_round_trips() {
        let signed = sign_cookie("a.b.c", "secret");
        assert_eq!(unsign_cookie(&signed, "secret").as_deref(), Some("a.b.c"));
    }

    #[test]
    fn test_header_value_attributes() {
        let expires = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let cookie = SetCookie::signed("ext_session_1", "id", "secret", Some(expires));
        let header = cookie.header_value();
        assert!(header.starts_with("ext_session_1=s%3Aid."));
        assert!(header.contains("Expires=Wed, 02 Jan 2030 03:04:05 GMT"));
        assert!(header.ends_with("HttpOnly; Secure; SameSite=None"));
    }

    #[test]
    fn test_parse_cookie_header_decodes_values() {
        let cookies = parse_cookie_header("a=1; ext_session_1=s%3Aid.sig; broken");
        assert_eq!(cookies.get("a").map(String::as_str), Some("1"));
        assert_eq!(
            cookies.get("ext_session_1").map(String::as_str),
            Some("s:id.sig")
        );
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn test_debug_masks_value() {
        let cookie = SetCookie::signed("n", "session-id", "secret", None);
        assert!(!format!("{cookie:?}").contains("session-id"));
    }
}
