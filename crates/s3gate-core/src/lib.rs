//! Core types, configuration, and errors shared by the s3gate crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use types::Credential;
