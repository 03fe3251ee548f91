//! The pass/deny status value consumed by the host application.

use chrono::{DateTime, Utc};
use kasir_token::{Tier, TokenPayload};
use serde::{Deserialize, Serialize};

/// Outcome of a license check.
///
/// Feature flags on this value trace back to a signature verification;
/// the host application must branch on these and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseStatus {
    /// True if the license is currently considered valid.
    pub ok: bool,
    /// Verified tier, when `ok`.
    pub tier: Option<Tier>,
    /// Short human-readable reason, when not `ok`. Never raw network
    /// error text.
    pub reason: Option<String>,
    /// License expiry carried in the verified payload, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Telegram integration entitlement from the verified payload.
    pub telegram_allowed: bool,
    /// Update eligibility from the verified payload.
    pub updates_allowed: bool,
}

impl LicenseStatus {
    /// Builds an ok status from a verified token payload.
    #[must_use]
    pub fn granted(payload: &TokenPayload) -> Self {
        Self {
            ok: true,
            tier: Some(payload.tier),
            reason: None,
            expires_at: payload.expires_at,
            telegram_allowed: payload.telegram_allowed,
            updates_allowed: payload.updates_allowed,
        }
    }

    /// Builds a not-ok status with a short reason.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            tier: None,
            reason: Some(reason.into()),
            expires_at: None,
            telegram_allowed: false,
            updates_allowed: false,
        }
    }
}
