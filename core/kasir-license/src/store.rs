//! Persistent client state: the operator-entered license key and the last
//! verified signed token.
//!
//! The two live in separate files so that replacing the key does not
//! invalidate a token still usable for offline grace, and a corrupted
//! token file cannot destroy the entered key.

use crate::error::{LicenseError, LicenseResult};
use kasir_token::SignedToken;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const LICENSE_KEY_FILE: &str = "license_key.txt";
const TOKEN_FILE: &str = "activation.json";

/// The persisted token record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredActivation {
    /// Canonical payload bytes, base64url without padding.
    pub payload_b64: String,
    /// Detached signature, base64url without padding.
    pub sig_b64: String,
    /// When this record was written, unix seconds.
    pub saved_at: i64,
    /// Last successful heartbeat ping, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ping: Option<i64>,
}

impl StoredActivation {
    /// The signed token envelope held in this record.
    #[must_use]
    pub fn token(&self) -> SignedToken {
        SignedToken {
            payload_b64: self.payload_b64.clone(),
            sig_b64: self.sig_b64.clone(),
        }
    }
}

/// File-backed store under a directory the process controls exclusively.
#[derive(Debug, Clone)]
pub struct ActivationStore {
    dir: PathBuf,
}

impl ActivationStore {
    /// Opens a store rooted at `dir`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The default per-user store location.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("kasir").join("license"))
    }

    /// Opens the store at [`Self::default_dir`].
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::NotConfigured`] if no per-user data
    /// directory can be resolved on this platform.
    pub fn open_default() -> LicenseResult<Self> {
        Self::default_dir()
            .map(Self::new)
            .ok_or_else(|| LicenseError::NotConfigured("no user data directory".to_string()))
    }

    /// The directory backing this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the stored license key, if one has been entered.
    #[must_use]
    pub fn license_key(&self) -> Option<String> {
        let text = fs::read_to_string(self.dir.join(LICENSE_KEY_FILE)).ok()?;
        let key = text.trim().to_string();
        (!key.is_empty()).then_some(key)
    }

    /// Persists the operator-entered license key. The token file is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be written.
    pub fn save_license_key(&self, key: &str) -> LicenseResult<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(LICENSE_KEY_FILE), key.trim())?;
        Ok(())
    }

    /// Loads the persisted token record. A missing or unparseable file
    /// reads as no token.
    #[must_use]
    pub fn load_token(&self) -> Option<StoredActivation> {
        let text = fs::read_to_string(self.dir.join(TOKEN_FILE)).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Replaces the stored token wholesale with a freshly verified one.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error on failure; the previous
    /// file is only replaced on a successful write.
    pub fn save_token(&self, token: &SignedToken, now_ts: i64) -> LicenseResult<()> {
        let record = StoredActivation {
            payload_b64: token.payload_b64.clone(),
            sig_b64: token.sig_b64.clone(),
            saved_at: now_ts,
            last_ping: self.load_token().and_then(|t| t.last_ping),
        };
        self.write_record(&record)
    }

    /// Records a successful heartbeat ping. No-op if there is no token.
    ///
    /// # Errors
    ///
    /// Returns a storage or serialization error on failure.
    pub fn record_ping(&self, now_ts: i64) -> LicenseResult<()> {
        let Some(mut record) = self.load_token() else {
            return Ok(());
        };
        record.last_ping = Some(now_ts);
        self.write_record(&record)
    }

    /// The last recorded heartbeat, unix seconds.
    #[must_use]
    pub fn last_ping(&self) -> Option<i64> {
        self.load_token()?.last_ping
    }

    fn write_record(&self, record: &StoredActivation) -> LicenseResult<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.dir.join(TOKEN_FILE), json)?;
        Ok(())
    }
}
