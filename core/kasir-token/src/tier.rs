//! License tiers and their entitlement flags.

use crate::error::TokenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The license tier. Closed set; immutable after issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Time-limited evaluation license.
    Trial,
    /// Paid base tier.
    Standard,
    /// Paid tier with Telegram integration.
    Pro,
    /// Top tier with Telegram integration and update eligibility.
    Unlimited,
}

/// Entitlement flags derived from a tier.
///
/// Computed once at issuance and carried inside the signed payload; clients
/// read them from a verified token and never re-derive them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierFlags {
    /// Telegram integration enabled.
    pub telegram_allowed: bool,
    /// Eligible for application updates.
    pub updates_allowed: bool,
}

impl Tier {
    /// Returns the total entitlement mapping for this tier.
    #[must_use]
    pub fn flags(&self) -> TierFlags {
        TierFlags {
            telegram_allowed: matches!(self, Self::Pro | Self::Unlimited),
            updates_allowed: matches!(self, Self::Unlimited),
        }
    }

    /// Returns the lowercase wire/storage name of this tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Standard => "standard",
            Self::Pro => "pro",
            Self::Unlimited => "unlimited",
        }
    }

    /// Returns true if licenses of this tier require an expiry date.
    #[must_use]
    pub fn requires_expiry(&self) -> bool {
        matches!(self, Self::Trial)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trial" => Ok(Self::Trial),
            "standard" => Ok(Self::Standard),
            "pro" => Ok(Self::Pro),
            "unlimited" => Ok(Self::Unlimited),
            other => Err(TokenError::UnknownTier(other.to_string())),
        }
    }
}
