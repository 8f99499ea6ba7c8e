//! Credential lookup by credential scope.
//!
//! A request names its credential through the `(access key id, region,
//! service)` triple in its credential scope. [`match_credential`] resolves that
//! triple against the configured list; [`CredentialProvider`] is the seam for
//! stores other than a plain list.

use s3gate_core::Credential;

use crate::error::AuthError;

/// Trait for looking up a credential by its scope.
pub trait CredentialProvider: Send + Sync {
    /// Find the credential for the given access key ID, region and service.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownCredential`] if nothing matches.
    fn find(&self, access_key_id: &str, region: &str, service: &str)
    -> Result<&Credential, AuthError>;
}

/// Return the first credential matching all three fields exactly.
///
/// # Errors
///
/// Returns [`AuthError::UnknownCredential`] if no entry matches.
///
/// # Examples
///
/// ```
/// use s3gate_auth::credentials::match_credential;
/// use s3gate_core::Credential;
///
/// let creds = vec![Credential::new("AKID", "secret", "us-east-1", "s3")];
/// let cred = match_credential("AKID", "us-east-1", "s3", &creds).unwrap();
/// assert_eq!(cred.secret_key, "secret");
/// assert!(match_credential("AKID", "eu-west-1", "s3", &creds).is_err());
/// ```
pub fn match_credential<'a>(
    access_key_id: &str,
    region: &str,
    service: &str,
    credentials: &'a [Credential],
) -> Result<&'a Credential, AuthError> {
    credentials
        .iter()
        .find(|c| c.matches(access_key_id, region, service))
        .ok_or_else(|| AuthError::UnknownCredential {
            access_key_id: access_key_id.to_owned(),
            region: region.to_owned(),
            service: service.to_owned(),
        })
}

/// An in-memory credential provider backed by the configured list.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialProvider {
    credentials: Vec<Credential>,
}

impl StaticCredentialProvider {
    /// Create a provider from an iterable of credentials.
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> Self {
        Self {
            credentials: credentials.into_iter().collect(),
        }
    }

    /// The configured credentials, in lookup order.
    #[must_use]
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }
}

impl From<Vec<Credential>> for StaticCredentialProvider {
    fn from(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn find(
        &self,
        access_key_id: &str,
        region: &str,
        service: &str,
    ) -> Result<&Credential, AuthError> {
        match_credential(access_key_id, region, service, &self.credentials)
    }
}
