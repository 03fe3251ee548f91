//! Error types for the client licensing crate.
//!
//! These stay internal to the crate: [`crate::LicenseManager`] converts
//! every failure into a not-ok [`crate::LicenseStatus`] before it crosses
//! the public boundary.

use thiserror::Error;

/// Client-side licensing errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Token signature or public key did not check out.
    #[error("activation token invalid (signature/key)")]
    SignatureInvalid,

    /// The locally held token is past its own TTL.
    #[error("activation token expired")]
    TokenExpired,

    /// A required piece of configuration is missing.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Network failure during activation or ping.
    #[error("network error: {0}")]
    Network(String),

    /// Reading or writing the local license files failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Persisted state could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for client licensing operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
