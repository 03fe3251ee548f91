//! Signed entitlement tokens for the kasir license system.
//!
//! This crate holds the trust primitives shared by the license server and
//! the client trust cache:
//! - The closed [`Tier`] enumeration and its total entitlement mapping
//! - The canonical [`TokenPayload`] and its [`SignedToken`] envelope
//! - Ed25519 signing ([`SigningAuthority`]) and offline verification
//! - Human-typable license key generation
//!
//! # Token format
//!
//! A signed token is two base64url (no padding) fields:
//! `payload_b64` (canonical JSON payload bytes) and `sig_b64` (a detached
//! 64-byte Ed25519 signature over those exact bytes). Verification decodes
//! both fields and verifies the signature against the decoded payload bytes
//! before parsing them; the payload is never re-serialized on the verify
//! path.

mod error;
mod key;
mod payload;
mod sign;
mod tier;

pub use error::{TokenError, TokenResult};
pub use key::{generate_license_key, KEY_ALPHABET};
pub use payload::{SignedToken, TokenPayload};
pub use sign::{verify_signed, verify_token, SigningAuthority, PUBLIC_KEY_LEN, SIGNATURE_LEN};
pub use tier::{Tier, TierFlags};
