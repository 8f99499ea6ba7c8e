//! Resolution of signed header names to request values.
//!
//! Three names are answered from request metadata instead of the header map:
//! `host`, `method` and `content-length`. Everything else is looked up in the
//! headers, case-insensitively, with repeated values joined by `", "`.

use http::HeaderValue;
use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::request::Parts;

use crate::error::AuthError;

/// Resolve the value a signer would have seen for `name`.
///
/// Returns `Ok(None)` if the header is not on the request; callers must treat
/// that as a verification failure rather than substituting a default. Values
/// are taken as UTF-8, so non-ASCII text such as `café` resolves as sent.
///
/// # Errors
///
/// Returns [`AuthError::MalformedRequest`] if a value of the header is not
/// valid UTF-8.
///
/// # Examples
///
/// ```
/// use s3gate_auth::resolve::resolve_signed_header;
///
/// let (parts, ()) = http::Request::builder()
///     .method("PUT")
///     .uri("http://examplebucket.s3.amazonaws.com/test.txt")
///     .header("x-amz-meta-tag", "a")
///     .header("x-amz-meta-tag", "b")
///     .body(())
///     .unwrap()
///     .into_parts();
///
/// let resolve = |name| resolve_signed_header(name, &parts).unwrap();
/// assert_eq!(resolve("Host").as_deref(), Some("examplebucket.s3.amazonaws.com"));
/// assert_eq!(resolve("method").as_deref(), Some("PUT"));
/// assert_eq!(resolve("x-amz-meta-tag").as_deref(), Some("a, b"));
/// assert_eq!(resolve("range"), None);
/// ```
pub fn resolve_signed_header(name: &str, parts: &Parts) -> Result<Option<String>, AuthError> {
    match name.to_ascii_lowercase().as_str() {
        "host" => Ok(Some(request_host(parts)?.to_owned())),
        "method" => Ok(Some(parts.method.as_str().to_owned())),
        "content-length" => Ok(Some(declared_content_length(parts).to_string())),
        lower => match header_values(parts, name)? {
            Some(value) => Ok(Some(value)),
            None => header_values(parts, lower),
        },
    }
}

/// The host the request was addressed to.
///
/// Taken from the URI authority for absolute-form targets, otherwise from the
/// `Host` header. Empty if neither is present.
///
/// # Errors
///
/// Returns [`AuthError::MalformedRequest`] if the `Host` header is not UTF-8.
pub fn request_host(parts: &Parts) -> Result<&str, AuthError> {
    if let Some(authority) = parts.uri.authority() {
        return Ok(authority.as_str());
    }
    parts
        .headers
        .get(HOST)
        .map_or(Ok(""), |value| header_text(HOST.as_str(), value))
}

/// The declared body length: `-1` when unknown (chunked or unparseable), `0`
/// when no length is declared at all.
#[must_use]
pub fn declared_content_length(parts: &Parts) -> i64 {
    if let Some(value) = parts.headers.get(CONTENT_LENGTH) {
        return value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(-1);
    }

    let chunked = parts.headers.get_all(TRANSFER_ENCODING).iter().any(|v| {
        v.to_str()
            .is_ok_and(|v| v.to_ascii_lowercase().contains("chunked"))
    });
    if chunked { -1 } else { 0 }
}

/// Join every value of `name` with `", "`, or `None` if there are none.
fn header_values(parts: &Parts, name: &str) -> Result<Option<String>, AuthError> {
    let values = parts
        .headers
        .get_all(name)
        .iter()
        .map(|value| header_text(name, value))
        .collect::<Result<Vec<&str>, _>>()?;

    if values.is_empty() {
        Ok(None)
    } else {
        Ok(Some(values.join(", ")))
    }
}

/// A header value as UTF-8 text. Lossy decoding would let distinct byte
/// sequences sign identically, so invalid bytes are an error.
fn header_text<'a>(name: &str, value: &'a HeaderValue) -> Result<&'a str, AuthError> {
    std::str::from_utf8(value.as_bytes()).map_err(|_| {
        AuthError::MalformedRequest(format!("header {name} is not valid UTF-8"))
    })
}
