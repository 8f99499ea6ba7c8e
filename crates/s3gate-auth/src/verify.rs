//! Verification of SigV4 `Authorization` headers.
//!
//! Each request passes through a fixed sequence of gates:
//!
//! 1. Parse the `Authorization` header.
//! 2. Match the credential scope against the configured credentials.
//! 3. Resolve every header listed in `SignedHeaders` from the live request.
//! 4. Check the age of a signed `x-amz-date`, if one is present.
//! 5. Rebuild the canonical request and recompute the signature.
//! 6. Render the recomputed header and compare it byte-for-byte with the one
//!    received, with and without a space after each comma.
//!
//! The first failing gate rejects the request. Nothing is retained between
//! calls, so a single [`SigV4Verifier`] can be shared across threads.
//!
//! The main entry point is [`verify_sigv4`].

use chrono::{DateTime, TimeDelta, Utc};
use http::request::Parts;
use s3gate_core::{Credential, GateConfig};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::authorization::{Authorization, COMPACT, SPACED};
use crate::canonical::{canonical_uri_path, parse_query};
use crate::credentials::{CredentialProvider, StaticCredentialProvider};
use crate::error::{AuthError, HeaderParseError};
use crate::resolve::resolve_signed_header;
use crate::sigv4::{AMZ_DATE_HEADER, SignableRequest};
use crate::skew::{DEFAULT_MAX_SKEW, check_request_time};

/// The result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// The access key ID that signed the request.
    pub access_key_id: String,
    /// The region from the credential scope.
    pub region: String,
    /// The service from the credential scope.
    pub service: String,
    /// The signed header names, sorted and lowercased.
    pub signed_headers: Vec<String>,
}

/// Per-deployment verification settings.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Header carrying the signature.
    pub header_name: String,
    /// Maximum age of a signed `x-amz-date`.
    pub max_skew: TimeDelta,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            header_name: GateConfig::DEFAULT_HEADER_NAME.to_owned(),
            max_skew: DEFAULT_MAX_SKEW,
        }
    }
}

impl From<&GateConfig> for VerifyOptions {
    fn from(config: &GateConfig) -> Self {
        let max_skew = i64::try_from(config.max_skew_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            header_name: config.header_name.clone(),
            max_skew,
        }
    }
}

/// Verify the SigV4 header on an HTTP request.
///
/// # Errors
///
/// Returns the [`AuthError`] of the first gate that rejects the request:
/// - [`AuthError::HeaderParse`] if the header is absent or malformed
/// - [`AuthError::UnknownCredential`] if no credential matches the scope
/// - [`AuthError::MalformedRequest`] if the query or path cannot be decoded
/// - [`AuthError::MissingSignedHeader`] if a signed header is not on the request
/// - [`AuthError::InvalidTimestamp`] or [`AuthError::ClockSkew`] for a bad `x-amz-date`
/// - [`AuthError::SignatureMismatch`] if the recomputed header differs
pub fn verify_sigv4(
    parts: &Parts,
    credentials: &dyn CredentialProvider,
    options: &VerifyOptions,
    now: DateTime<Utc>,
) -> Result<AuthResult, AuthError> {
    let result = run_gates(parts, credentials, options, now);
    match &result {
        // The recomputed candidates stay at debug level.
        Err(AuthError::SignatureMismatch { received, .. }) => warn!(
            method = %parts.method,
            path = %parts.uri.path(),
            received = %received,
            "SigV4 signature mismatch"
        ),
        Err(err) => warn!(
            method = %parts.method,
            path = %parts.uri.path(),
            error = %err,
            "SigV4 verification rejected request"
        ),
        Ok(_) => {}
    }
    result
}

fn run_gates(
    parts: &Parts,
    credentials: &dyn CredentialProvider,
    options: &VerifyOptions,
    now: DateTime<Utc>,
) -> Result<AuthResult, AuthError> {
    let header = match parts.headers.get(options.header_name.as_str()) {
        Some(value) => value.to_str().map_err(|_| HeaderParseError::InvalidFormat)?,
        None => "",
    };

    let auth = Authorization::parse(header)?;

    debug!(
        access_key_id = %auth.access_key_id,
        date = %auth.date,
        region = %auth.region,
        service = %auth.service,
        "Verifying SigV4 signature"
    );

    let credential = credentials.find(&auth.access_key_id, &auth.region, &auth.service)?;

    let query_params = parse_query(parts.uri.query().unwrap_or(""))?;

    let signed_headers = auth
        .signed_headers
        .iter()
        .map(|name| {
            resolve_signed_header(name, parts)?
                .map(|value| (name.to_ascii_lowercase(), value))
                .ok_or_else(|| AuthError::MissingSignedHeader(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Requests signing over the plain `date` header are not skew-checked.
    if let Some((_, amz_date)) = signed_headers
        .iter()
        .find(|(name, value)| name == AMZ_DATE_HEADER && !value.is_empty())
    {
        check_request_time(amz_date, now, options.max_skew)?;
    }

    let uri_path = canonical_uri_path(parts.uri.path())?;
    let request = SignableRequest::new(
        credential,
        parts.method.as_str(),
        uri_path,
        &auth.date,
        query_params,
        signed_headers,
    )?;

    let expected = request.sign();
    let compact = expected.render(COMPACT);
    let spaced = expected.render(SPACED);

    if matches_header(header, &compact) || matches_header(header, &spaced) {
        debug!(access_key_id = %expected.access_key_id, "Signature verification succeeded");
        return Ok(AuthResult {
            access_key_id: expected.access_key_id,
            region: expected.region,
            service: expected.service,
            signed_headers: expected.signed_headers,
        });
    }

    for (name, value) in request.signed_headers() {
        debug!(header = %name, value = %value, "signed header");
    }
    debug!(
        canonical_request = %request.canonical_request(),
        "Signature mismatch"
    );
    Err(AuthError::SignatureMismatch {
        expected: compact,
        expected_spaced: spaced,
        received: header.to_owned(),
    })
}

/// Byte-for-byte comparison in constant time.
fn matches_header(received: &str, candidate: &str) -> bool {
    received.as_bytes().ct_eq(candidate.as_bytes()).into()
}

/// A verifier bound to a credential store and options.
#[derive(Debug, Clone)]
pub struct SigV4Verifier<P = StaticCredentialProvider> {
    credentials: P,
    options: VerifyOptions,
}

impl SigV4Verifier<StaticCredentialProvider> {
    /// Build a verifier from loaded configuration.
    #[must_use]
    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(
            StaticCredentialProvider::from(config.credentials.clone()),
            VerifyOptions::from(config),
        )
    }

    /// Build a verifier over a fixed list of credentials with default options.
    pub fn with_credentials(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self::new(
            StaticCredentialProvider::new(credentials),
            VerifyOptions::default(),
        )
    }
}

impl<P: CredentialProvider> SigV4Verifier<P> {
    /// Create a verifier.
    pub fn new(credentials: P, options: VerifyOptions) -> Self {
        Self {
            credentials,
            options,
        }
    }

    /// The options this verifier applies.
    #[must_use]
    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Verify `parts` as of `now`. See [`verify_sigv4`].
    pub fn verify_at(&self, parts: &Parts, now: DateTime<Utc>) -> Result<AuthResult, AuthError> {
        verify_sigv4(parts, &self.credentials, &self.options, now)
    }

    /// Verify `parts` against the current system time.
    pub fn verify(&self, parts: &Parts) -> Result<AuthResult, AuthError> {
        self.verify_at(parts, Utc::now())
    }
}
