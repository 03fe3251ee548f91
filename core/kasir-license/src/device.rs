//! Device fingerprinting for license binding.
//!
//! The fingerprint is a coarse, best-effort binding key, not a security
//! boundary: it combines OS family, OS release, architecture, hostname and
//! a platform machine id into one opaque stable string. An explicit
//! override always wins, for containerized or virtualized deployments
//! where hardware identifiers are unstable.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::env;

/// Environment override honored by [`default_provider`].
pub const FINGERPRINT_ENV: &str = "DEVICE_FINGERPRINT";

/// Produces the opaque device fingerprint string.
pub trait FingerprintProvider: Send + Sync {
    /// Returns the fingerprint for this device. Infallible: platform
    /// probes that fail degrade to the coarser components.
    fn fingerprint(&self) -> String;
}

/// A fixed, externally supplied fingerprint (override or tests).
pub struct FixedFingerprint(String);

impl FixedFingerprint {
    /// Wraps an explicit fingerprint string.
    #[must_use]
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self(fingerprint.into())
    }
}

impl FingerprintProvider for FixedFingerprint {
    fn fingerprint(&self) -> String {
        self.0.clone()
    }
}

/// Fingerprint derived from the running machine's identifiers.
pub struct MachineFingerprint;

impl FingerprintProvider for MachineFingerprint {
    fn fingerprint(&self) -> String {
        let mut parts: Vec<String> = vec![
            env::consts::OS.to_string(),
            os_release(),
            env::consts::ARCH.to_string(),
            get_hostname(),
        ];
        if let Some(machine_id) = machine_id() {
            parts.push(machine_id);
        }
        parts.retain(|p| !p.is_empty());

        let mut hasher = Sha256::new();
        hasher.update(parts.join("|").as_bytes());
        let hash = hasher.finalize();
        URL_SAFE_NO_PAD.encode(&hash[..16])
    }
}

/// Selects the provider for this process: the `DEVICE_FINGERPRINT`
/// environment override if set, otherwise the machine probe.
#[must_use]
pub fn default_provider() -> Box<dyn FingerprintProvider> {
    match env::var(FINGERPRINT_ENV) {
        Ok(fp) if !fp.trim().is_empty() => Box::new(FixedFingerprint::new(fp.trim())),
        _ => Box::new(MachineFingerprint),
    }
}

fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// OS release string, best effort per platform.
fn os_release() -> String {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/os-release")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("VERSION_ID="))
                    .map(|l| {
                        l.trim_start_matches("VERSION_ID=")
                            .trim_matches('"')
                            .to_string()
                    })
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("sw_vers")
            .arg("-productVersion")
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    #[cfg(target_os = "windows")]
    {
        "windows".to_string()
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        "unknown".to_string()
    }
}

/// Platform machine id, if one can be read.
fn machine_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        // /etc/machine-id first, D-Bus fallback
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(target_os = "windows")]
    {
        // Firmware UUID via WMI
        std::process::Command::new("wmic")
            .args(["csproduct", "get", "uuid"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty() && !l.eq_ignore_ascii_case("uuid"))
                    .map(String::from)
            })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        None
    }
}
