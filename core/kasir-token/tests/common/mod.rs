//! Shared test helpers for token tests.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Utc};
use kasir_token::{SigningAuthority, Tier, TokenPayload};

/// Returns a deterministic signing authority from a fixed seed.
pub fn test_authority() -> SigningAuthority {
    let seed: [u8; 32] = [
        7, 1, 9, 4, 2, 8, 6, 3, 5, 0, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    SigningAuthority::from_base64(&STANDARD.encode(seed)).unwrap()
}

/// Builds a payload for `tier` issued now, with the token valid for
/// `ttl_days` days. Entitlement flags follow the tier mapping, the way the
/// server derives them at issuance.
pub fn make_payload(tier: Tier, ttl_days: i64) -> TokenPayload {
    make_payload_at(tier, Utc::now().timestamp(), ttl_days)
}

/// Builds a payload with an explicit token issue time (unix seconds).
pub fn make_payload_at(tier: Tier, iat: i64, ttl_days: i64) -> TokenPayload {
    let flags = tier.flags();
    let expires_at = if tier.requires_expiry() {
        Some(Utc::now() + Duration::days(30))
    } else {
        None
    };
    TokenPayload {
        license_key: "AAAAA-BBBBB-CCCCC-DDDDD".to_string(),
        tier,
        telegram_allowed: flags.telegram_allowed,
        updates_allowed: flags.updates_allowed,
        device_fingerprint: "test-device".to_string(),
        issued_at: Utc::now(),
        expires_at,
        iat,
        exp: iat + ttl_days * 24 * 60 * 60,
    }
}
