//! Credential definitions shared across the gate.

use std::fmt;

/// A configured access key, bound to exactly one region and service.
///
/// Credentials are loaded once with the configuration and only read afterwards.
#[derive(Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// The access key ID clients put in the credential scope.
    #[serde(rename = "accessKeyID", alias = "accessKeyId")]
    pub access_key_id: String,
    /// The secret key used to derive signing keys.
    pub secret_key: String,
    /// The region the key is valid for.
    pub region: String,
    /// The service the key is valid for.
    pub service: String,
}

impl Credential {
    /// Default region for credentials that do not name one.
    pub const DEFAULT_REGION: &str = "us-east-1";

    /// Default service for credentials that do not name one.
    pub const DEFAULT_SERVICE: &str = "s3";

    /// Create a new credential.
    #[must_use]
    pub fn new(
        access_key_id: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_key: secret_key.into(),
            region: region.into(),
            service: service.into(),
        }
    }

    /// Whether this credential is the one named by the given scope.
    ///
    /// All three fields must match exactly, case included.
    #[must_use]
    pub fn matches(&self, access_key_id: &str, region: &str, service: &str) -> bool {
        self.access_key_id == access_key_id && self.region == region && self.service == service
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("service", &self.service)
            .finish()
    }
}
