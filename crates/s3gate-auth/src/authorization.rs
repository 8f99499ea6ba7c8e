//! Parsing and rendering of the SigV4 `Authorization` header.
//!
//! Format:
//! ```text
//! AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request,
//!   SignedHeaders=host;x-amz-content-sha256;x-amz-date,
//!   Signature=<hex-signature>
//! ```
//!
//! Clients differ on whether a space follows each comma, so the renderer takes
//! the separator padding as an argument.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::HeaderParseError;

/// The only algorithm suffix accepted after `AWS4-HMAC-`.
pub const SUPPORTED_ALGORITHM: &str = "SHA256";

/// Padding used by clients that write `,SignedHeaders=`.
pub const COMPACT: &str = "";

/// Padding used by clients that write `, SignedHeaders=`.
pub const SPACED: &str = " ";

static HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^AWS4-HMAC-(?P<algo>[A-Za-z0-9]*)\s*Credential=(?P<access_key_id>.*)/(?P<date>[0-9]{8})/(?P<region>.*)/(?P<service>.*)/aws4_request,\s*SignedHeaders=(?P<signed_headers>.*),\s*Signature=(?P<signature>.*)$",
    )
    .expect("authorization header pattern is valid")
});

/// A parsed (or recomputed) SigV4 `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Algorithm suffix after `AWS4-HMAC-`; always `SHA256` once parsed.
    pub algorithm: String,
    /// The access key ID.
    pub access_key_id: String,
    /// The date component of the credential scope (`YYYYMMDD`).
    pub date: String,
    /// The region from the credential scope.
    pub region: String,
    /// The service from the credential scope.
    pub service: String,
    /// Signed header names, in the order they were written.
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

impl Authorization {
    /// Parse an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderParseError::Empty`] for an empty value,
    /// [`HeaderParseError::InvalidFormat`] when the structure does not match,
    /// [`HeaderParseError::UnsupportedAlgorithm`] for anything but `SHA256`, and
    /// [`HeaderParseError::MissingField`] when a component is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3gate_auth::authorization::Authorization;
    ///
    /// let auth = Authorization::parse(
    ///     "AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request, \
    ///      SignedHeaders=host;x-amz-date, Signature=abc123",
    /// )
    /// .unwrap();
    /// assert_eq!(auth.access_key_id, "AKID");
    /// assert_eq!(auth.signed_headers, vec!["host", "x-amz-date"]);
    /// ```
    pub fn parse(header: &str) -> Result<Self, HeaderParseError> {
        if header.is_empty() {
            return Err(HeaderParseError::Empty);
        }

        let caps = HEADER_PATTERN
            .captures(header)
            .ok_or(HeaderParseError::InvalidFormat)?;
        let field = |name: &str| caps.name(name).map_or("", |m| m.as_str());

        let algorithm = field("algo");
        if algorithm != SUPPORTED_ALGORITHM {
            return Err(HeaderParseError::UnsupportedAlgorithm(algorithm.to_owned()));
        }

        for (group, label) in [
            ("access_key_id", "AccessKeyId"),
            ("date", "Date"),
            ("region", "Region"),
            ("service", "Service"),
            ("signed_headers", "SignedHeaders"),
            ("signature", "Signature"),
        ] {
            if field(group).is_empty() {
                return Err(HeaderParseError::MissingField(label));
            }
        }

        Ok(Self {
            algorithm: algorithm.to_owned(),
            access_key_id: field("access_key_id").to_owned(),
            date: field("date").to_owned(),
            region: field("region").to_owned(),
            service: field("service").to_owned(),
            signed_headers: field("signed_headers")
                .split(';')
                .map(ToOwned::to_owned)
                .collect(),
            signature: field("signature").to_owned(),
        })
    }

    /// Render the header, putting `pad` after each comma.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3gate_auth::authorization::{Authorization, COMPACT};
    ///
    /// let auth = Authorization {
    ///     algorithm: "SHA256".to_owned(),
    ///     access_key_id: "AKID".to_owned(),
    ///     date: "20130524".to_owned(),
    ///     region: "us-east-1".to_owned(),
    ///     service: "s3".to_owned(),
    ///     signed_headers: vec!["host".to_owned()],
    ///     signature: "abc".to_owned(),
    /// };
    /// assert_eq!(
    ///     auth.render(COMPACT),
    ///     "AWS4-HMAC-SHA256 Credential=AKID/20130524/us-east-1/s3/aws4_request,\
    ///      SignedHeaders=host,Signature=abc"
    /// );
    /// ```
    #[must_use]
    pub fn render(&self, pad: &str) -> String {
        format!(
            "AWS4-HMAC-{} Credential={}/aws4_request,{pad}SignedHeaders={},{pad}Signature={}",
            self.algorithm,
            self.scope_prefix(),
            self.signed_headers.join(";"),
            self.signature,
        )
    }

    fn scope_prefix(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.access_key_id, self.date, self.region, self.service
        )
    }
}
