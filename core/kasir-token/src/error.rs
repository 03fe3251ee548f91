//! Error types for token signing and verification.

use thiserror::Error;

/// Token-level errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing key material is malformed (wrong encoding or length).
    #[error("invalid signing key material: {0}")]
    InvalidKeyMaterial(String),

    /// The payload could not be serialized for signing.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Verification failed.
    ///
    /// Bad base64, a wrong-length signature, a signature mismatch and an
    /// unparseable verified payload all collapse into this one variant so
    /// the failure mode leaks nothing about which check tripped.
    #[error("token verification failed")]
    VerificationFailed,

    /// A tier string outside the closed set.
    #[error("unknown tier: {0}")]
    UnknownTier(String),
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
