//! Per-request enforcement gate.
//!
//! A thin decision function the host application wires into its request
//! path. It only ever branches on a [`crate::LicenseStatus`] obtained from
//! the trust cache; it never re-derives entitlements from anything else.

use crate::manager::LicenseManager;
use crate::status::LicenseStatus;
use std::sync::Arc;

/// What to do with an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Let the request through.
    Allow,
    /// Send the user to the activation flow, with the reason to display.
    RedirectToActivation {
        /// Short reason from the last status check.
        reason: String,
    },
}

/// Gate configuration.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// When false (development/demo builds), everything passes.
    pub enforce: bool,
    /// Path of the activation flow; always reachable to avoid a lockout
    /// loop.
    pub activation_path: String,
    /// Path prefixes that always pass (static assets, the activation UI).
    pub exempt_prefixes: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enforce: true,
            activation_path: "/license".to_string(),
            exempt_prefixes: vec!["/static/".to_string(), "/license".to_string()],
        }
    }
}

impl GateConfig {
    /// A gate that passes everything (unlicensed development builds).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enforce: false,
            ..Self::default()
        }
    }
}

/// The enforcement gate over a shared trust cache.
pub struct Gate {
    config: GateConfig,
    manager: Arc<LicenseManager>,
}

impl Gate {
    /// Creates a gate over `manager`.
    #[must_use]
    pub fn new(config: GateConfig, manager: Arc<LicenseManager>) -> Self {
        Self { config, manager }
    }

    /// The configured activation path, for building the redirect.
    #[must_use]
    pub fn activation_path(&self) -> &str {
        &self.config.activation_path
    }

    /// Decides whether a request for `path` passes.
    #[must_use]
    pub fn check(&self, path: &str) -> GateDecision {
        if !self.config.enforce {
            return GateDecision::Allow;
        }
        if self
            .config
            .exempt_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return GateDecision::Allow;
        }

        let status = self.manager.get_status(false);
        if status.ok {
            GateDecision::Allow
        } else {
            GateDecision::RedirectToActivation {
                reason: status
                    .reason
                    .unwrap_or_else(|| "license not activated".to_string()),
            }
        }
    }

    /// Handles an activation form submission: persists the key and
    /// refreshes immediately so the user sees the outcome.
    pub fn submit_key(&self, key: &str) -> LicenseStatus {
        self.manager.set_license_key(key)
    }

    /// The trust cache behind this gate.
    #[must_use]
    pub fn manager(&self) -> &Arc<LicenseManager> {
        &self.manager
    }
}
