mod common;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, TimeZone, Utc};
use common::{make_payload, make_payload_at, test_authority};
use ed25519_dalek::{Signer, SigningKey};
use kasir_token::{verify_signed, verify_token, SigningAuthority, Tier, TokenError};
use proptest::prelude::*;

// ── Round trip ───────────────────────────────────────────────────

#[test]
fn sign_verify_round_trip() {
    let authority = test_authority();
    let payload = make_payload(Tier::Pro, 7);
    let token = authority.sign(&payload).unwrap();
    let verified = verify_signed(&token, &authority.public_key_bytes()).unwrap();
    assert_eq!(verified, payload);
}

#[test]
fn round_trip_preserves_null_expiry() {
    let authority = test_authority();
    let payload = make_payload(Tier::Unlimited, 7);
    assert!(payload.expires_at.is_none());
    let token = authority.sign(&payload).unwrap();
    let verified = verify_signed(&token, &authority.public_key_bytes()).unwrap();
    assert!(verified.expires_at.is_none());
}

#[test]
fn round_trip_preserves_trial_expiry() {
    let authority = test_authority();
    let payload = make_payload(Tier::Trial, 7);
    assert!(payload.expires_at.is_some());
    let token = authority.sign(&payload).unwrap();
    let verified = verify_signed(&token, &authority.public_key_bytes()).unwrap();
    assert_eq!(verified.expires_at, payload.expires_at);
}

// ── Verification failures ────────────────────────────────────────

#[test]
fn verify_rejects_wrong_public_key() {
    let authority = test_authority();
    let other = SigningAuthority::generate();
    let token = authority.sign(&make_payload(Tier::Standard, 7)).unwrap();
    let result = verify_signed(&token, &other.public_key_bytes());
    assert!(matches!(result, Err(TokenError::VerificationFailed)));
}

#[test]
fn verify_rejects_tampered_payload_byte() {
    let authority = test_authority();
    let token = authority.sign(&make_payload(Tier::Pro, 7)).unwrap();
    let mut bytes = URL_SAFE_NO_PAD.decode(&token.payload_b64).unwrap();
    bytes[0] ^= 0x01;
    let tampered = URL_SAFE_NO_PAD.encode(&bytes);
    let result = verify_token(&tampered, &token.sig_b64, &authority.public_key_bytes());
    assert!(matches!(result, Err(TokenError::VerificationFailed)));
}

#[test]
fn verify_rejects_tampered_signature_byte() {
    let authority = test_authority();
    let token = authority.sign(&make_payload(Tier::Pro, 7)).unwrap();
    let mut bytes = URL_SAFE_NO_PAD.decode(&token.sig_b64).unwrap();
    bytes[10] ^= 0x80;
    let tampered = URL_SAFE_NO_PAD.encode(&bytes);
    let result = verify_token(&token.payload_b64, &tampered, &authority.public_key_bytes());
    assert!(matches!(result, Err(TokenError::VerificationFailed)));
}

#[test]
fn verify_rejects_bad_base64() {
    let authority = test_authority();
    let result = verify_token("!!!", "???", &authority.public_key_bytes());
    assert!(matches!(result, Err(TokenError::VerificationFailed)));
}

#[test]
fn verify_rejects_short_signature() {
    let authority = test_authority();
    let token = authority.sign(&make_payload(Tier::Pro, 7)).unwrap();
    let short = URL_SAFE_NO_PAD.encode([0u8; 12]);
    let result = verify_token(&token.payload_b64, &short, &authority.public_key_bytes());
    assert!(matches!(result, Err(TokenError::VerificationFailed)));
}

#[test]
fn verify_rejects_validly_signed_garbage() {
    // A correct signature over bytes that are not a payload still fails,
    // with the same collapsed error.
    let authority = test_authority();
    let seed: [u8; 32] = [9; 32];
    let raw_key = SigningKey::from_bytes(&seed);
    let garbage = b"not a token payload";
    let sig = SigningKey::from_bytes(&seed).sign(garbage);
    let result = verify_token(
        &URL_SAFE_NO_PAD.encode(garbage),
        &URL_SAFE_NO_PAD.encode(sig.to_bytes()),
        &raw_key.verifying_key().to_bytes(),
    );
    assert!(matches!(result, Err(TokenError::VerificationFailed)));
    // And against the unrelated authority key it fails just the same.
    let result = verify_token(
        &URL_SAFE_NO_PAD.encode(garbage),
        &URL_SAFE_NO_PAD.encode(sig.to_bytes()),
        &authority.public_key_bytes(),
    );
    assert!(matches!(result, Err(TokenError::VerificationFailed)));
}

// ── Token TTL ────────────────────────────────────────────────────

#[test]
fn token_ttl_is_independent_of_license_expiry() {
    // Pro license never expires, but its token does.
    let issued = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let payload = make_payload_at(Tier::Pro, issued.timestamp(), 7);
    assert!(payload.expires_at.is_none());

    assert!(!payload.is_token_expired(issued + Duration::days(6)));
    assert!(payload.is_token_expired(issued + Duration::days(8)));
}

#[test]
fn token_not_expired_at_exact_exp() {
    let issued = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    let payload = make_payload_at(Tier::Standard, issued.timestamp(), 7);
    assert!(!payload.is_token_expired(issued + Duration::days(7)));
    assert!(payload.is_token_expired(issued + Duration::days(7) + Duration::seconds(1)));
}

// ── Canonical bytes ──────────────────────────────────────────────

#[test]
fn canonical_bytes_are_compact_and_ordered() {
    let payload = make_payload(Tier::Pro, 7);
    let bytes = payload.canonical_bytes().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(!text.contains(' '));
    let key_pos = text.find("\"license_key\"").unwrap();
    let tier_pos = text.find("\"tier\"").unwrap();
    let exp_pos = text.find("\"exp\"").unwrap();
    assert!(key_pos < tier_pos);
    assert!(tier_pos < exp_pos);
}

#[test]
fn envelope_fields_are_unpadded_base64url() {
    let authority = test_authority();
    let token = authority.sign(&make_payload(Tier::Trial, 7)).unwrap();
    assert!(!token.payload_b64.contains('='));
    assert!(!token.sig_b64.contains('='));
    assert!(!token.payload_b64.contains('+'));
    assert!(!token.sig_b64.contains('/'));
}

// ── Authority key handling ───────────────────────────────────────

#[test]
fn authority_rejects_bad_seed_encoding() {
    assert!(matches!(
        SigningAuthority::from_base64("not base64 at all !!!"),
        Err(TokenError::InvalidKeyMaterial(_))
    ));
}

#[test]
fn authority_rejects_wrong_seed_length() {
    let short = base64::engine::general_purpose::STANDARD.encode([1u8; 16]);
    assert!(matches!(
        SigningAuthority::from_base64(&short),
        Err(TokenError::InvalidKeyMaterial(_))
    ));
}

#[test]
fn authority_round_trips_its_own_keys() {
    let authority = SigningAuthority::generate();
    let reloaded = SigningAuthority::from_base64(&authority.private_key_base64()).unwrap();
    assert_eq!(
        reloaded.public_key_bytes(),
        authority.public_key_bytes()
    );
}

// ── Property: round trip and single-bit mutations ────────────────

proptest! {
    #[test]
    fn prop_round_trip(
        key in "[A-Z2-9]{5}-[A-Z2-9]{5}-[A-Z2-9]{5}-[A-Z2-9]{5}",
        fp in "[a-zA-Z0-9_-]{1,64}",
        iat in 0i64..=4_000_000_000,
        ttl in 1i64..=30,
    ) {
        let authority = test_authority();
        let mut payload = make_payload_at(Tier::Standard, iat, ttl);
        payload.license_key = key;
        payload.device_fingerprint = fp;
        let token = authority.sign(&payload).unwrap();
        let verified = verify_signed(&token, &authority.public_key_bytes()).unwrap();
        prop_assert_eq!(verified, payload);
    }

    #[test]
    fn prop_any_payload_bit_flip_fails(
        iat in 0i64..=4_000_000_000,
        byte_choice: prop::sample::Index,
        bit in 0u8..8,
    ) {
        let authority = test_authority();
        let payload = make_payload_at(Tier::Pro, iat, 7);
        let token = authority.sign(&payload).unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&token.payload_b64).unwrap();
        let idx = byte_choice.index(bytes.len());
        bytes[idx] ^= 1 << bit;
        let tampered = URL_SAFE_NO_PAD.encode(&bytes);

        let result = verify_token(&tampered, &token.sig_b64, &authority.public_key_bytes());
        prop_assert!(result.is_err());
    }

    #[test]
    fn prop_any_signature_bit_flip_fails(
        iat in 0i64..=4_000_000_000,
        byte_choice: prop::sample::Index,
        bit in 0u8..8,
    ) {
        let authority = test_authority();
        let payload = make_payload_at(Tier::Pro, iat, 7);
        let token = authority.sign(&payload).unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&token.sig_b64).unwrap();
        let idx = byte_choice.index(bytes.len());
        bytes[idx] ^= 1 << bit;
        let tampered = URL_SAFE_NO_PAD.encode(&bytes);

        let result = verify_token(&token.payload_b64, &tampered, &authority.public_key_bytes());
        prop_assert!(result.is_err());
    }
}
