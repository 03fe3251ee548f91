//! Ed25519 signing authority and offline verification.
//!
//! The private key lives only on the license server and is provisioned out
//! of band as standard base64 of the raw 32-byte seed. The matching public
//! key is distributed with the client; the server never transmits it.

use crate::error::{TokenError, TokenResult};
use crate::payload::{SignedToken, TokenPayload};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// Raw Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Detached Ed25519 signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Holds the private signing key and produces signed entitlement tokens.
pub struct SigningAuthority {
    key: SigningKey,
}

impl SigningAuthority {
    /// Loads the authority from standard base64 of the raw 32-byte seed.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidKeyMaterial`] if the encoding or length
    /// is wrong. A missing key is a deployment misconfiguration and is
    /// handled before this point, at process startup.
    pub fn from_base64(seed_b64: &str) -> TokenResult<Self> {
        let bytes = STANDARD
            .decode(seed_b64.trim())
            .map_err(|e| TokenError::InvalidKeyMaterial(format!("bad base64: {e}")))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TokenError::InvalidKeyMaterial("seed must be 32 bytes".to_string()))?;
        Ok(Self {
            key: SigningKey::from_bytes(&seed),
        })
    }

    /// Generates a fresh random authority (key provisioning tool).
    #[must_use]
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Returns the private seed as standard base64.
    #[must_use]
    pub fn private_key_base64(&self) -> String {
        STANDARD.encode(self.key.to_bytes())
    }

    /// Returns the public key as standard base64.
    #[must_use]
    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.key.verifying_key().to_bytes())
    }

    /// Returns the raw public key bytes.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.key.verifying_key().to_bytes()
    }

    /// Signs the canonical serialization of `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Serialization`] if the payload cannot be
    /// encoded.
    pub fn sign(&self, payload: &TokenPayload) -> TokenResult<SignedToken> {
        let bytes = payload.canonical_bytes()?;
        let signature = self.key.sign(&bytes);
        Ok(SignedToken {
            payload_b64: URL_SAFE_NO_PAD.encode(&bytes),
            sig_b64: URL_SAFE_NO_PAD.encode(signature.to_bytes()),
        })
    }
}

/// Verifies a signed token against a raw public key and returns the parsed
/// payload.
///
/// The signature is checked over the exact decoded payload bytes; the
/// payload is parsed only after verification succeeds and is never
/// re-serialized first.
///
/// # Errors
///
/// Returns [`TokenError::VerificationFailed`] for every failure mode:
/// malformed base64, wrong signature length, bad public key, signature
/// mismatch, or an unparseable verified payload.
pub fn verify_token(
    payload_b64: &str,
    sig_b64: &str,
    public_key: &[u8; PUBLIC_KEY_LEN],
) -> TokenResult<TokenPayload> {
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64.trim())
        .map_err(|_| TokenError::VerificationFailed)?;
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64.trim())
        .map_err(|_| TokenError::VerificationFailed)?;

    let signature =
        Signature::from_slice(&sig_bytes).map_err(|_| TokenError::VerificationFailed)?;
    let verifying_key =
        VerifyingKey::from_bytes(public_key).map_err(|_| TokenError::VerificationFailed)?;

    verifying_key
        .verify(&payload_bytes, &signature)
        .map_err(|_| TokenError::VerificationFailed)?;

    serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::VerificationFailed)
}

/// Verifies a [`SignedToken`] envelope.
///
/// # Errors
///
/// See [`verify_token`].
pub fn verify_signed(
    token: &SignedToken,
    public_key: &[u8; PUBLIC_KEY_LEN],
) -> TokenResult<TokenPayload> {
    verify_token(&token.payload_b64, &token.sig_b64, public_key)
}
