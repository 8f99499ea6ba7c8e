//! Error types for the s3gate core.

/// Core error type for s3gate configuration.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The credential list could not be decoded.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(#[from] serde_json::Error),
}

/// Convenience result type for s3gate configuration.
pub type GateResult<T> = Result<T, GateError>;
