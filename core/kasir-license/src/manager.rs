//! The client trust cache: local verification first, online activation as
//! fallback, heartbeat pings throttled and best-effort.

use crate::device::{default_provider, FingerprintProvider};
use crate::status::LicenseStatus;
use crate::store::ActivationStore;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use kasir_token::{verify_token, PUBLIC_KEY_LEN};
#[cfg(feature = "online")]
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Mutex;
use std::time::Duration;

/// Heartbeat pings go out at most once per this interval.
pub const PING_INTERVAL_SECS: i64 = 6 * 3600;

const DEFAULT_ACTIVATE_TIMEOUT: Duration = Duration::from_secs(6);
const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(3);

/// Client-side licensing configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the activation server. None disables all network use.
    pub server_url: Option<String>,
    /// Raw Ed25519 public key of the signing authority. Distributed with
    /// the client build, never received from the server.
    pub public_key: [u8; PUBLIC_KEY_LEN],
    /// License key supplied by the environment, taking precedence over the
    /// stored one.
    pub license_key_override: Option<String>,
    /// Application identifier sent on activation.
    pub app_name: String,
    /// Application version sent on activation and pings.
    pub app_version: String,
    /// Opt-in heartbeat pings.
    pub ping_enabled: bool,
    /// Network timeout for online activation.
    pub activate_timeout: Duration,
    /// Network timeout for heartbeat pings.
    pub ping_timeout: Duration,
}

impl ClientConfig {
    /// A configuration with the given public key and no server.
    #[must_use]
    pub fn new(public_key: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self {
            server_url: None,
            public_key,
            license_key_override: None,
            app_name: "kasir".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            ping_enabled: false,
            activate_timeout: DEFAULT_ACTIVATE_TIMEOUT,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    /// Builds the configuration from the environment, starting from
    /// `default_public_key` (the key baked into the build).
    ///
    /// Recognized variables: `LICENSE_SERVER_URL`,
    /// `LICENSE_SERVER_PUBLIC_KEY_B64` (overrides the baked-in key),
    /// `KASIR_LICENSE_KEY`, `APP_VERSION`, `LICENSE_PING` (`true` opts in).
    #[must_use]
    pub fn from_env(default_public_key: [u8; PUBLIC_KEY_LEN]) -> Self {
        let mut config = Self::new(default_public_key);

        if let Some(url) = non_empty_env("LICENSE_SERVER_URL") {
            config.server_url = Some(url);
        }
        if let Some(pk_b64) = non_empty_env("LICENSE_SERVER_PUBLIC_KEY_B64") {
            match STANDARD.decode(&pk_b64) {
                Ok(bytes) => match <[u8; PUBLIC_KEY_LEN]>::try_from(bytes.as_slice()) {
                    Ok(key) => config.public_key = key,
                    Err(_) => {
                        tracing::warn!("LICENSE_SERVER_PUBLIC_KEY_B64 is not 32 bytes, ignoring");
                    }
                },
                Err(e) => tracing::warn!("LICENSE_SERVER_PUBLIC_KEY_B64 not base64 ({e}), ignoring"),
            }
        }
        config.license_key_override = non_empty_env("KASIR_LICENSE_KEY");
        if let Some(version) = non_empty_env("APP_VERSION") {
            config.app_version = version;
        }
        config.ping_enabled = non_empty_env("LICENSE_PING")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        config
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(feature = "online")]
#[derive(Debug, Serialize)]
struct ActivateRequest<'a> {
    license_key: &'a str,
    device_fingerprint: &'a str,
    app: &'a str,
    app_version: &'a str,
}

#[cfg(feature = "online")]
#[derive(Debug, Serialize)]
struct PingRequest<'a> {
    license_key: &'a str,
    device_fingerprint: &'a str,
    app_version: &'a str,
}

#[cfg(feature = "online")]
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// The client trust cache.
///
/// Safe to share behind an `Arc` and call from concurrent request
/// handlers: the memoized status lives in a mutex that is held across a
/// refresh, so concurrent callers coalesce on a single online attempt
/// instead of issuing redundant network calls.
pub struct LicenseManager {
    config: ClientConfig,
    store: ActivationStore,
    provider: Box<dyn FingerprintProvider>,
    cached: Mutex<Option<LicenseStatus>>,
}

impl LicenseManager {
    /// Creates a manager with the platform fingerprint provider.
    #[must_use]
    pub fn new(config: ClientConfig, store: ActivationStore) -> Self {
        Self::with_provider(config, store, default_provider())
    }

    /// Creates a manager with an explicit fingerprint provider.
    #[must_use]
    pub fn with_provider(
        config: ClientConfig,
        store: ActivationStore,
        provider: Box<dyn FingerprintProvider>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
            cached: Mutex::new(None),
        }
    }

    /// The fingerprint this machine activates with.
    #[must_use]
    pub fn device_fingerprint(&self) -> String {
        self.provider.fingerprint()
    }

    /// The license key in effect: environment override first, then the
    /// stored one.
    #[must_use]
    pub fn license_key(&self) -> Option<String> {
        self.config
            .license_key_override
            .clone()
            .or_else(|| self.store.license_key())
    }

    /// Persists a newly entered license key and refreshes the status so
    /// the caller gets synchronous feedback.
    pub fn set_license_key(&self, key: &str) -> LicenseStatus {
        if let Err(e) = self.store.save_license_key(key) {
            tracing::error!("failed to persist license key: {e}");
            return LicenseStatus::denied("could not save license key");
        }
        self.get_status(true)
    }

    /// Verifies the cached token with no network access.
    #[must_use]
    pub fn validate_local(&self) -> LicenseStatus {
        self.validate_local_at(Utc::now())
    }

    /// [`Self::validate_local`] at an explicit instant.
    #[must_use]
    pub fn validate_local_at(&self, now: DateTime<Utc>) -> LicenseStatus {
        let Some(stored) = self.store.load_token() else {
            return LicenseStatus::denied("activation token not found");
        };
        match verify_token(&stored.payload_b64, &stored.sig_b64, &self.config.public_key) {
            Err(_) => LicenseStatus::denied("activation token invalid (signature/key)"),
            Ok(payload) => {
                if payload.is_token_expired(now) {
                    let mut status = LicenseStatus::denied("activation token expired");
                    status.expires_at = payload.expires_at;
                    status
                } else {
                    LicenseStatus::granted(&payload)
                }
            }
        }
    }

    /// Returns the memoized status, computing it if absent or `refresh` is
    /// set.
    ///
    /// Local validation runs first; a valid token may trigger a throttled
    /// best-effort heartbeat whose failure never changes the result. If
    /// local validation fails, online activation is attempted; if that
    /// also fails, the local reason is returned since it is the more
    /// actionable one.
    #[must_use]
    pub fn get_status(&self, refresh: bool) -> LicenseStatus {
        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !refresh {
            if let Some(status) = cached.as_ref() {
                return status.clone();
            }
        }

        let local = self.validate_local();
        if local.ok {
            #[cfg(feature = "online")]
            if self.should_ping(Utc::now().timestamp()) {
                self.try_ping_online();
            }
            *cached = Some(local.clone());
            return local;
        }

        #[cfg(feature = "online")]
        {
            let online = self.activate_online();
            let status = if online.ok { online } else { local };
            *cached = Some(status.clone());
            return status;
        }

        #[cfg(not(feature = "online"))]
        {
            *cached = Some(local.clone());
            local
        }
    }

    /// True if the last known-good status allows Telegram integration.
    #[must_use]
    pub fn allows_telegram(&self) -> bool {
        let status = self.get_status(false);
        status.ok && status.telegram_allowed
    }

    /// True if the last known-good status allows updates.
    #[must_use]
    pub fn allows_updates(&self) -> bool {
        let status = self.get_status(false);
        status.ok && status.updates_allowed
    }

    #[cfg(feature = "online")]
    fn should_ping(&self, now_ts: i64) -> bool {
        if !self.config.ping_enabled || self.config.server_url.is_none() {
            return false;
        }
        match self.store.last_ping() {
            None => true,
            Some(last) => now_ts - last >= PING_INTERVAL_SECS,
        }
    }
}

#[cfg(feature = "online")]
impl LicenseManager {
    /// Activates against the server and persists the returned token after
    /// re-verifying its signature locally. Never panics or returns an
    /// error; every failure becomes a not-ok status. A failure leaves the
    /// previously stored token untouched.
    #[must_use]
    pub fn activate_online(&self) -> LicenseStatus {
        let Some(base) = self.config.server_url.as_deref() else {
            return LicenseStatus::denied("license server url not configured");
        };
        let Some(key) = self.license_key() else {
            return LicenseStatus::denied("license key not set");
        };
        let fingerprint = self.device_fingerprint();

        let request = ActivateRequest {
            license_key: &key,
            device_fingerprint: &fingerprint,
            app: &self.config.app_name,
            app_version: &self.config.app_version,
        };

        let response = match self
            .http_client(self.config.activate_timeout)
            .and_then(|client| {
                client
                    .post(format!("{}/api/activate", base.trim_end_matches('/')))
                    .json(&request)
                    .send()
                    .map_err(|e| e.to_string())
            }) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("online activation failed: {e}");
                return LicenseStatus::denied("activation failed (network error)");
            }
        };

        let code = response.status();
        if !code.is_success() {
            // Surface the server's short reason when it sent one.
            let reason = response
                .json::<ErrorBody>()
                .ok()
                .and_then(|b| b.error)
                .map_or_else(
                    || format!("activation failed ({})", code.as_u16()),
                    |e| format!("activation failed: {e}"),
                );
            tracing::warn!("activation rejected by server: {reason}");
            return LicenseStatus::denied(reason);
        }

        let token: kasir_token::SignedToken = match response.json() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("activation response unparseable: {e}");
                return LicenseStatus::denied("activation response invalid");
            }
        };

        // Trust nothing off the wire: verify with the same key used for
        // local validation before persisting.
        if verify_token(&token.payload_b64, &token.sig_b64, &self.config.public_key).is_err() {
            return LicenseStatus::denied("activation response signature invalid");
        }

        if let Err(e) = self.store.save_token(&token, Utc::now().timestamp()) {
            tracing::error!("failed to persist activation token: {e}");
            return LicenseStatus::denied("could not save activation token");
        }
        self.validate_local()
    }

    /// Fires a heartbeat ping, best effort. Failures are logged and
    /// swallowed.
    pub fn try_ping_online(&self) {
        let Some(base) = self.config.server_url.as_deref() else {
            return;
        };
        let Some(key) = self.license_key() else {
            return;
        };
        let fingerprint = self.device_fingerprint();
        let request = PingRequest {
            license_key: &key,
            device_fingerprint: &fingerprint,
            app_version: &self.config.app_version,
        };

        let sent = self.http_client(self.config.ping_timeout).and_then(|client| {
            client
                .post(format!(
                    "{}/api/ping",
                    base.trim_end_matches('/')
                ))
                .json(&request)
                .send()
                .map_err(|e| e.to_string())
        });
        match sent {
            Ok(_) => {
                if let Err(e) = self.store.record_ping(Utc::now().timestamp()) {
                    tracing::debug!("could not record ping time: {e}");
                }
            }
            Err(e) => tracing::debug!("heartbeat ping failed: {e}"),
        }
    }

    fn http_client(&self, timeout: Duration) -> Result<reqwest::blocking::Client, String> {
        reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())
    }
}
