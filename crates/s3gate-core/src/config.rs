//! Configuration for the s3gate verifier.
//!
//! Configuration is driven by environment variables or a JSON document. The
//! credential list is read once and never mutated afterwards.

use tracing::info;

use crate::error::{GateError, GateResult};
use crate::types::Credential;

/// Global configuration for s3gate.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GateConfig {
    /// Credentials accepted by the verifier.
    pub credentials: Vec<Credential>,
    /// Name of the header carrying the signature.
    pub header_name: String,
    /// Maximum age of a signed `x-amz-date`, in seconds.
    pub max_skew_secs: u64,
}

impl GateConfig {
    /// Default header carrying the signature.
    pub const DEFAULT_HEADER_NAME: &str = "Authorization";

    /// Default maximum clock skew (15 minutes).
    pub const DEFAULT_MAX_SKEW_SECS: u64 = 15 * 60;

    /// Parse configuration from a JSON document.
    ///
    /// Fields that are absent fall back to their defaults.
    pub fn from_json(json: &str) -> GateResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `S3GATE_CREDENTIALS` | *(unset)* | JSON array of credentials |
    /// | `S3GATE_HEADER_NAME` | `Authorization` | Header carrying the signature |
    /// | `S3GATE_MAX_SKEW_SECONDS` | `900` | Maximum `x-amz-date` age |
    /// | `ACCESS_KEY` / `AWS_ACCESS_KEY_ID` | *(unset)* | Single credential access key |
    /// | `SECRET_KEY` / `AWS_SECRET_ACCESS_KEY` | *(unset)* | Single credential secret key |
    /// | `REGION` / `AWS_REGION` | `us-east-1` | Single credential region |
    /// | `SERVICE` | `s3` | Single credential service |
    pub fn from_env() -> GateResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// [`GateConfig::from_env`] calls this with the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GateResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("S3GATE_CREDENTIALS") {
            config.credentials = serde_json::from_str(&v)?;
        }
        if let Some(v) = lookup("S3GATE_HEADER_NAME") {
            config.header_name = v;
        }
        if let Some(v) = lookup("S3GATE_MAX_SKEW_SECONDS") {
            config.max_skew_secs = v.parse().map_err(|_| {
                GateError::Config(format!("S3GATE_MAX_SKEW_SECONDS is not an integer: {v}"))
            })?;
        }
        if let Some(cred) = single_credential(&lookup) {
            info!(
                access_key_id = %cred.access_key_id,
                region = %cred.region,
                service = %cred.service,
                "configured credential from environment"
            );
            config.credentials.push(cred);
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> GateResult<()> {
        if self.header_name.trim().is_empty() {
            return Err(GateError::Config("header name must not be empty".to_owned()));
        }
        if let Some(cred) = self.credentials.iter().find(|c| {
            c.access_key_id.is_empty()
                || c.secret_key.is_empty()
                || c.region.is_empty()
                || c.service.is_empty()
        }) {
            return Err(GateError::Config(format!(
                "credential {:?} has an empty field",
                cred.access_key_id
            )));
        }
        Ok(())
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            credentials: Vec::new(),
            header_name: Self::DEFAULT_HEADER_NAME.to_owned(),
            max_skew_secs: Self::DEFAULT_MAX_SKEW_SECS,
        }
    }
}

/// Build a credential from `ACCESS_KEY` / `SECRET_KEY` style variables.
fn single_credential(lookup: &impl Fn(&str) -> Option<String>) -> Option<Credential> {
    let access_key = lookup("ACCESS_KEY").or_else(|| lookup("AWS_ACCESS_KEY_ID"))?;
    let secret_key = lookup("SECRET_KEY").or_else(|| lookup("AWS_SECRET_ACCESS_KEY"))?;
    let region = lookup("REGION")
        .or_else(|| lookup("AWS_REGION"))
        .unwrap_or_else(|| Credential::DEFAULT_REGION.to_owned());
    let service = lookup("SERVICE").unwrap_or_else(|| Credential::DEFAULT_SERVICE.to_owned());

    Some(Credential::new(access_key, secret_key, region, service))
}
