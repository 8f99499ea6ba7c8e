//! Error types for SigV4 verification.
//!
//! Every failure is terminal for the request being verified. [`AuthError`]
//! names the stage that rejected it.

use chrono::TimeDelta;

/// Reasons an `Authorization` header value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderParseError {
    /// The header is absent or empty.
    #[error("empty header")]
    Empty,

    /// The header does not follow the `AWS4-HMAC-*` structure.
    #[error("invalid header format")]
    InvalidFormat,

    /// The algorithm suffix is not `SHA256`.
    #[error("unsupported algorithm: {0:?}")]
    UnsupportedAlgorithm(String),

    /// A required component is empty after extraction.
    #[error("missing field: {0}")]
    MissingField(&'static str),
}

/// Errors that can occur while verifying a SigV4 `Authorization` header.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The header could not be parsed.
    #[error("failed to parse authorization header: {0}")]
    HeaderParse(#[from] HeaderParseError),

    /// No configured credential matches the scope of the request.
    #[error("unknown access key id: {access_key_id:?}, region: {region:?}, service: {service:?}")]
    UnknownCredential {
        /// Access key ID from the credential scope.
        access_key_id: String,
        /// Region from the credential scope.
        region: String,
        /// Service from the credential scope.
        service: String,
    },

    /// A header listed in `SignedHeaders` has no value on the request.
    #[error("missing signed header: {0:?}")]
    MissingSignedHeader(String),

    /// The request timestamp could not be parsed.
    #[error("invalid request timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The signed `x-amz-date` is older than the allowed skew.
    #[error("request time too skewed: request is {skew} old, maximum is {max}")]
    ClockSkew {
        /// How far the request time lags behind now.
        skew: TimeDelta,
        /// The configured maximum.
        max: TimeDelta,
    },

    /// The request path or query string cannot be canonicalized.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The recomputed header differs from the one sent.
    #[error("signature mismatch: expected {expected:?} or {expected_spaced:?}, got {received:?}")]
    SignatureMismatch {
        /// Recomputed header without spaces after commas.
        expected: String,
        /// Recomputed header with one space after commas.
        expected_spaced: String,
        /// The header as received.
        received: String,
    },
}
