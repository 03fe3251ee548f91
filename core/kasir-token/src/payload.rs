//! The signed entitlement payload and its transport envelope.

use crate::tier::{Tier, TierFlags};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The entitlement payload covered by the server signature.
///
/// Field order is the canonical serialization order; the signature covers
/// the compact JSON encoding of exactly these fields. `issued_at` and
/// `expires_at` describe the underlying license; `iat`/`exp` (unix seconds)
/// bound the token itself, which is deliberately shorter-lived than the
/// license so a revoked or expired license is rediscovered without server
/// contact once the token runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// The license key this token was issued for.
    pub license_key: String,
    /// License tier as stored server-side.
    pub tier: Tier,
    /// Telegram integration entitlement, derived from the tier at issuance.
    pub telegram_allowed: bool,
    /// Update eligibility, derived from the tier at issuance.
    pub updates_allowed: bool,
    /// The device fingerprint the token is bound to.
    pub device_fingerprint: String,
    /// When the license itself was issued.
    pub issued_at: DateTime<Utc>,
    /// License expiry, or None for non-expiring licenses.
    pub expires_at: Option<DateTime<Utc>>,
    /// Token issue time, unix seconds.
    pub iat: i64,
    /// Token expiry, unix seconds (`iat` + TTL).
    pub exp: i64,
}

impl TokenPayload {
    /// Serializes the payload into its canonical signed form (compact JSON,
    /// declaration field order).
    pub fn canonical_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Returns true if the token itself has expired at `now`, independent
    /// of the underlying license expiry.
    #[must_use]
    pub fn is_token_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }

    /// Entitlement flags as carried in the payload.
    #[must_use]
    pub fn flags(&self) -> TierFlags {
        TierFlags {
            telegram_allowed: self.telegram_allowed,
            updates_allowed: self.updates_allowed,
        }
    }
}

/// The wire/persisted envelope: two base64url (no padding) fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedToken {
    /// Canonical payload bytes, base64url without padding.
    pub payload_b64: String,
    /// 64-byte Ed25519 signature over the payload bytes, base64url without
    /// padding.
    pub sig_b64: String,
}
