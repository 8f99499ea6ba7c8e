//! AWS Signature Version 4 signing.
//!
//! Given a [`SignableRequest`], this module recomputes the signature a holder
//! of the credential's secret key would have produced:
//!
//! 1. Build the canonical request and hash it.
//! 2. Build the string to sign from the request time, credential scope and
//!    canonical request hash.
//! 3. Derive the signing key with the HMAC-SHA256 chain over date, region,
//!    service and `aws4_request`.
//! 4. Sign the string to sign and render the result as an [`Authorization`].

use std::collections::BTreeMap;

use hmac::{Hmac, KeyInit, Mac};
use s3gate_core::Credential;
use sha2::{Digest, Sha256};

use crate::authorization::{Authorization, SUPPORTED_ALGORITHM};
use crate::canonical::{QueryParams, build_canonical_request};
use crate::error::AuthError;

/// Algorithm name written at the top of the string to sign.
const SIGNING_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Signed header whose value, when present, is the request time.
pub const AMZ_DATE_HEADER: &str = "x-amz-date";

type HmacSha256 = Hmac<Sha256>;

/// Everything needed to recompute a signature for one request.
///
/// Built once per verification from the live request and the matched
/// credential, then consumed by [`SignableRequest::sign`].
#[derive(Debug, Clone)]
pub struct SignableRequest<'a> {
    credential: &'a Credential,
    method: String,
    uri_path: String,
    request_datetime: String,
    query_params: QueryParams,
    signed_headers: BTreeMap<String, String>,
}

impl<'a> SignableRequest<'a> {
    /// Assemble a signable request.
    ///
    /// `signed_headers` keys are lowercased. The request time is the signed
    /// `x-amz-date` value if there is one, otherwise `scope_date`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidTimestamp`] if the request time is shorter
    /// than the 8-character date stamp it must start with.
    pub fn new(
        credential: &'a Credential,
        method: impl Into<String>,
        uri_path: impl Into<String>,
        scope_date: &str,
        query_params: QueryParams,
        signed_headers: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, AuthError> {
        let signed_headers: BTreeMap<String, String> = signed_headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        let request_datetime = signed_headers
            .get(AMZ_DATE_HEADER)
            .map_or(scope_date, String::as_str)
            .to_owned();
        if request_datetime.get(..8).is_none() {
            return Err(AuthError::InvalidTimestamp(request_datetime));
        }

        Ok(Self {
            credential,
            method: method.into(),
            uri_path: uri_path.into(),
            request_datetime,
            query_params,
            signed_headers,
        })
    }

    /// The request time used in the string to sign.
    #[must_use]
    pub fn request_datetime(&self) -> &str {
        &self.request_datetime
    }

    /// The `YYYYMMDD` prefix of the request time.
    #[must_use]
    pub fn date_stamp(&self) -> &str {
        &self.request_datetime[..8]
    }

    /// Resolved signed headers, keyed by lowercase name.
    #[must_use]
    pub fn signed_headers(&self) -> &BTreeMap<String, String> {
        &self.signed_headers
    }

    /// The credential scope, `date/region/service/aws4_request`.
    #[must_use]
    pub fn credential_scope(&self) -> String {
        format!(
            "{}/{}/{}/aws4_request",
            self.date_stamp(),
            self.credential.region,
            self.credential.service
        )
    }

    /// The canonical request string.
    #[must_use]
    pub fn canonical_request(&self) -> String {
        build_canonical_request(
            &self.method,
            &self.uri_path,
            &self.query_params,
            &self.signed_headers,
        )
    }

    /// The string to sign.
    #[must_use]
    pub fn string_to_sign(&self) -> String {
        let canonical_hash = hash_payload(self.canonical_request().as_bytes());
        build_string_to_sign(
            &self.request_datetime,
            &self.credential_scope(),
            &canonical_hash,
        )
    }

    /// The hex-encoded signature for this request.
    #[must_use]
    pub fn signature(&self) -> String {
        let signing_key = derive_signing_key(
            &self.credential.secret_key,
            self.date_stamp(),
            &self.credential.region,
            &self.credential.service,
        );
        compute_signature(&signing_key, &self.string_to_sign())
    }

    /// The `Authorization` header a correct signer would have sent.
    ///
    /// Signed header names come out sorted and lowercased.
    #[must_use]
    pub fn sign(&self) -> Authorization {
        Authorization {
            algorithm: SUPPORTED_ALGORITHM.to_owned(),
            access_key_id: self.credential.access_key_id.clone(),
            date: self.date_stamp().to_owned(),
            region: self.credential.region.clone(),
            service: self.credential.service.clone(),
            signed_headers: self.signed_headers.keys().cloned().collect(),
            signature: self.signature(),
        }
    }
}

/// Build the SigV4 string to sign.
///
/// # Examples
///
/// ```
/// use s3gate_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{SIGNING_ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Compute the hex-encoded HMAC-SHA256 of `data` under `signing_key`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Compute the SHA-256 hash of `payload` as lowercase hex.
///
/// This is the value clients put in `x-amz-content-sha256`.
///
/// # Examples
///
/// ```
/// use s3gate_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
