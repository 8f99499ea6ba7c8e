//! Canonical request construction for AWS Signature Version 4.
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! The query string is decoded, merged by key and re-encoded with form-value
//! rules, so any client encoding of the same parameters yields the same
//! canonical form. Header values are used exactly as resolved; no trimming or
//! whitespace folding is applied.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};

use crate::error::AuthError;

/// Signed header carrying the hex SHA-256 of the payload.
pub const CONTENT_SHA256_HEADER: &str = "x-amz-content-sha256";

/// Decoded query parameters, keyed and sorted by raw bytes.
///
/// Keys and values stay bytes because a query may carry escapes that do not
/// form UTF-8, and those must re-encode to exactly what the signer hashed.
pub type QueryParams = BTreeMap<Vec<u8>, Vec<u8>>;

/// Characters escaped in query keys and values.
///
/// Unreserved characters (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) are kept. Space
/// is kept here and turned into `+` afterwards.
const FORM_VALUE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b' ');

/// Build the full canonical request string.
///
/// `signed_headers` maps lowercase header names to their resolved values. The
/// hashed payload is the value of the signed `x-amz-content-sha256` header, or
/// empty if that header is not signed; the body itself is never hashed here.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use s3gate_auth::canonical::build_canonical_request;
///
/// let headers = BTreeMap::from([("host".to_owned(), "example.com".to_owned())]);
/// let canonical = build_canonical_request("GET", "/test.txt", &BTreeMap::new(), &headers);
/// assert_eq!(canonical, "GET\n/test.txt\n\nhost:example.com\n\nhost\n");
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    uri_path: &str,
    query_params: &QueryParams,
    signed_headers: &BTreeMap<String, String>,
) -> String {
    let canonical_query = build_canonical_query_string(query_params);
    let canonical_headers = build_canonical_headers(signed_headers);
    let signed_headers_str = build_signed_headers_string(signed_headers);
    let payload_hash = signed_headers
        .get(CONTENT_SHA256_HEADER)
        .map_or("", String::as_str);

    format!(
        "{method}\n{uri_path}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers_str}\n{payload_hash}"
    )
}

/// Decode the request path into the form used in the canonical request.
///
/// # Errors
///
/// Returns [`AuthError::MalformedRequest`] if the decoded path is not UTF-8.
pub fn canonical_uri_path(path: &str) -> Result<String, AuthError> {
    percent_decode_str(path)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| AuthError::MalformedRequest(format!("path is not valid UTF-8: {path:?}")))
}

/// Parse a raw query string into a key-sorted map.
///
/// Pairs are split on `&` and then on the first `=`. `+` decodes to a space.
/// Repeated keys are merged in arrival order, joined by `,`. Escapes decode to
/// raw bytes, which need not be UTF-8.
///
/// # Errors
///
/// Returns [`AuthError::MalformedRequest`] for a `;` separator or a malformed
/// `%` escape.
///
/// # Examples
///
/// ```
/// use s3gate_auth::canonical::parse_query;
///
/// let params = parse_query("b=2&a=1&b=3&flag&raw=%FF").unwrap();
/// assert_eq!(params.len(), 4);
/// assert_eq!(params[b"b".as_slice()], b"2,3");
/// assert_eq!(params[b"flag".as_slice()], b"");
/// assert_eq!(params[b"raw".as_slice()], b"\xFF");
/// ```
pub fn parse_query(raw: &str) -> Result<QueryParams, AuthError> {
    let mut params = QueryParams::new();

    for pair in raw.split('&').filter(|s| !s.is_empty()) {
        if pair.contains(';') {
            return Err(AuthError::MalformedRequest(
                "invalid semicolon separator in query".to_owned(),
            ));
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = form_decode(key)?;
        let value = form_decode(value)?;

        match params.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(mut entry) => {
                let merged = entry.get_mut();
                merged.push(b',');
                merged.extend_from_slice(&value);
            }
        }
    }

    Ok(params)
}

/// Build the canonical query string: `key=value` pairs sorted by key, each
/// side form-encoded, joined by `&`.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use s3gate_auth::canonical::build_canonical_query_string;
///
/// let params = BTreeMap::from([
///     (b"prefix".to_vec(), b"my photos".to_vec()),
///     (b"max-keys".to_vec(), b"2".to_vec()),
/// ]);
/// assert_eq!(build_canonical_query_string(&params), "max-keys=2&prefix=my+photos");
/// ```
#[must_use]
pub fn build_canonical_query_string(params: &QueryParams) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers block: one `name:value` line per signed header,
/// sorted by name, without a trailing newline.
#[must_use]
pub fn build_canonical_headers(signed_headers: &BTreeMap<String, String>) -> String {
    signed_headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the signed headers string, the sorted names joined by `;`.
#[must_use]
pub fn build_signed_headers_string(signed_headers: &BTreeMap<String, String>) -> String {
    signed_headers
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";")
}

/// Encode a query key or value with form-value rules.
fn form_encode(input: &[u8]) -> String {
    percent_encode(input, FORM_VALUE_ENCODE_SET)
        .to_string()
        .replace(' ', "+")
}

/// Decode a query key or value, rejecting malformed escapes.
fn form_decode(input: &str) -> Result<Vec<u8>, AuthError> {
    let bytes = input.as_bytes();
    for (i, _) in input.match_indices('%') {
        let well_formed = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !well_formed {
            return Err(AuthError::MalformedRequest(format!(
                "invalid escape in query: {input:?}"
            )));
        }
    }

    let spaced = input.replace('+', " ");
    Ok(percent_decode_str(&spaced).collect())
}

#[cfg(test)]
mod tests {
    use sha2::{Digest, Sha256};

    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn query(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn test_should_sort_query_parameters() {
        let params = parse_query("b=2&a=1&c=3").unwrap();
        assert_eq!(build_canonical_query_string(&params), "a=1&b=2&c=3");
    }

    #[test]
    fn test_should_return_empty_for_empty_query() {
        let params = parse_query("").unwrap();
        assert!(params.is_empty());
        assert_eq!(build_canonical_query_string(&params), "");
    }

    #[test]
    fn test_should_ignore_empty_pairs() {
        let params = parse_query("&&a=1&").unwrap();
        assert_eq!(build_canonical_query_string(&params), "a=1");
    }

    #[test]
    fn test_should_merge_duplicate_keys_in_arrival_order() {
        let params = parse_query("events=b&prefix=p&events=a").unwrap();
        assert_eq!(
            build_canonical_query_string(&params),
            "events=b%2Ca&prefix=p"
        );
    }

    #[test]
    fn test_should_produce_same_string_for_any_parameter_order() {
        let expected = build_canonical_query_string(&parse_query("a=1&b=2&c=3").unwrap());
        for query in ["c=3&b=2&a=1", "b=2&a=1&c=3", "b=2&c=3&a=1"] {
            assert_eq!(
                build_canonical_query_string(&parse_query(query).unwrap()),
                expected
            );
        }
    }

    #[test]
    fn test_should_normalize_equivalent_encodings() {
        let raw = build_canonical_query_string(&parse_query("events=s3:ObjectCreated:*").unwrap());
        let encoded =
            build_canonical_query_string(&parse_query("events=s3%3AObjectCreated%3A%2A").unwrap());
        assert_eq!(raw, encoded);
        assert_eq!(raw, "events=s3%3AObjectCreated%3A%2A");
    }

    #[test]
    fn test_should_encode_spaces_as_plus() {
        let params = parse_query("key=hello%20world&other=a+b").unwrap();
        assert_eq!(
            build_canonical_query_string(&params),
            "key=hello+world&other=a+b"
        );
    }

    #[test]
    fn test_should_keep_unreserved_characters() {
        let params = query(&[("a-b_c.d~e", "A-Z_0.9~")]);
        assert_eq!(build_canonical_query_string(&params), "a-b_c.d~e=A-Z_0.9~");
    }

    #[test]
    fn test_should_encode_reserved_and_non_ascii_characters() {
        let params = query(&[("k", "a/b+c=d&é")]);
        assert_eq!(
            build_canonical_query_string(&params),
            "k=a%2Fb%2Bc%3Dd%26%C3%A9"
        );
    }

    #[test]
    fn test_should_treat_missing_equals_as_empty_value() {
        let params = parse_query("lifecycle").unwrap();
        assert_eq!(build_canonical_query_string(&params), "lifecycle=");
    }

    #[test]
    fn test_should_reject_malformed_escape() {
        for query in ["a=%zz", "a=%", "a=%4", "%g1=b"] {
            assert!(
                matches!(parse_query(query), Err(AuthError::MalformedRequest(_))),
                "{query} should be rejected"
            );
        }
    }

    #[test]
    fn test_should_reject_semicolon_separator() {
        let result = parse_query("a=1;b=2");
        assert!(matches!(result, Err(AuthError::MalformedRequest(_))));
    }

    #[test]
    fn test_should_keep_non_utf8_query_bytes() {
        let params = parse_query("a=%FF&b=%C3%28&%fe=x").unwrap();
        assert_eq!(params[b"a".as_slice()], b"\xFF");
        assert_eq!(
            build_canonical_query_string(&params),
            "a=%FF&b=%C3%28&%FE=x"
        );
    }

    #[test]
    fn test_should_not_merge_distinct_invalid_sequences() {
        let one = build_canonical_query_string(&parse_query("a=%FF").unwrap());
        let other = build_canonical_query_string(&parse_query("a=%FE").unwrap());
        assert_ne!(one, other);
    }

    #[test]
    fn test_should_decode_uri_path() {
        assert_eq!(canonical_uri_path("/test.txt").unwrap(), "/test.txt");
        assert_eq!(
            canonical_uri_path("/hello%20world").unwrap(),
            "/hello world"
        );
        assert_eq!(canonical_uri_path("/a+b").unwrap(), "/a+b");
    }

    #[test]
    fn test_should_reject_non_utf8_path() {
        let result = canonical_uri_path("/%C3%28");
        assert!(matches!(result, Err(AuthError::MalformedRequest(_))));
    }

    #[test]
    fn test_should_build_canonical_headers_sorted() {
        let headers = map(&[
            ("x-amz-date", "20130524T000000Z"),
            ("host", "examplebucket.s3.amazonaws.com"),
            ("range", "bytes=0-9"),
        ]);
        assert_eq!(
            build_canonical_headers(&headers),
            "host:examplebucket.s3.amazonaws.com\nrange:bytes=0-9\nx-amz-date:20130524T000000Z"
        );
        assert_eq!(
            build_signed_headers_string(&headers),
            "host;range;x-amz-date"
        );
    }

    #[test]
    fn test_should_not_trim_header_values() {
        let headers = map(&[("x-custom", "  a   b  ")]);
        assert_eq!(build_canonical_headers(&headers), "x-custom:  a   b  ");
    }

    #[test]
    fn test_should_leave_payload_hash_empty_when_not_signed() {
        let headers = map(&[("host", "example.com")]);
        let canonical = build_canonical_request("PUT", "/", &BTreeMap::new(), &headers);
        assert!(canonical.ends_with("\nhost\n"));
    }

    #[test]
    fn test_should_build_canonical_request_matching_aws_example() {
        // AWS test vector: GET /test.txt from examplebucket
        let headers = map(&[
            ("host", "examplebucket.s3.amazonaws.com"),
            ("range", "bytes=0-9"),
            ("x-amz-content-sha256", EMPTY_SHA256),
            ("x-amz-date", "20130524T000000Z"),
        ]);

        let canonical = build_canonical_request("GET", "/test.txt", &BTreeMap::new(), &headers);

        let expected = "GET\n\
                        /test.txt\n\
                        \n\
                        host:examplebucket.s3.amazonaws.com\n\
                        range:bytes=0-9\n\
                        x-amz-content-sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n\
                        x-amz-date:20130524T000000Z\n\
                        \n\
                        host;range;x-amz-content-sha256;x-amz-date\n\
                        e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(canonical, expected);

        let hash = hex::encode(Sha256::digest(canonical.as_bytes()));
        assert_eq!(
            hash,
            "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972"
        );
    }
}
