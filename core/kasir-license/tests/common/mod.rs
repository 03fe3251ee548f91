//! Shared test helpers for client licensing tests.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, Utc};
use kasir_license::{ActivationStore, ClientConfig, FixedFingerprint, LicenseManager};
use kasir_token::{SignedToken, SigningAuthority, Tier, TokenPayload};

pub const TEST_FINGERPRINT: &str = "test-device-01";

/// Deterministic signing authority for tests.
pub fn test_authority() -> SigningAuthority {
    SigningAuthority::from_base64(&STANDARD.encode([42u8; 32])).unwrap()
}

/// Signs a token for `tier` bound to [`TEST_FINGERPRINT`], issued at `iat`
/// with the given TTL in days.
pub fn make_token(authority: &SigningAuthority, tier: Tier, iat: i64, ttl_days: i64) -> SignedToken {
    let flags = tier.flags();
    let expires_at = tier
        .requires_expiry()
        .then(|| Utc::now() + Duration::days(30));
    let payload = TokenPayload {
        license_key: "AAAAA-BBBBB-CCCCC-DDDDD".to_string(),
        tier,
        telegram_allowed: flags.telegram_allowed,
        updates_allowed: flags.updates_allowed,
        device_fingerprint: TEST_FINGERPRINT.to_string(),
        issued_at: Utc::now(),
        expires_at,
        iat,
        exp: iat + ttl_days * 24 * 60 * 60,
    };
    authority.sign(&payload).unwrap()
}

/// A manager over a store in `dir`, trusting `authority`, with a fixed
/// fingerprint and no server configured.
pub fn offline_manager(authority: &SigningAuthority, dir: &std::path::Path) -> LicenseManager {
    let config = ClientConfig::new(authority.public_key_bytes());
    LicenseManager::with_provider(
        config,
        ActivationStore::new(dir),
        Box::new(FixedFingerprint::new(TEST_FINGERPRINT)),
    )
}
