//! Environment-driven server configuration.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Defaults matching the deployed service.
pub const DEFAULT_DB: &str = "license_server.sqlite";
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 7;
pub const DEFAULT_PORT: u16 = 8088;

/// Configuration errors are startup-fatal; there is nothing to recover
/// at request time from a misprovisioned server.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The private signing key was not provisioned.
    #[error("LICENSE_SIGNING_KEY_B64 not set")]
    MissingSigningKey,

    /// An environment value failed to parse.
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// SQLite registry path.
    pub db_path: PathBuf,
    /// Standard base64 of the raw Ed25519 seed.
    pub signing_key_b64: String,
    /// Token TTL in days.
    pub token_ttl_days: i64,
    /// HTTP listen port.
    pub port: u16,
}

impl ServerConfig {
    /// Reads `LICENSE_DB`, `LICENSE_SIGNING_KEY_B64`, `TOKEN_TTL_DAYS`
    /// and `PORT`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSigningKey`] without a signing key,
    /// or [`ConfigError::Invalid`] for unparseable numeric values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let signing_key_b64 =
            non_empty_env("LICENSE_SIGNING_KEY_B64").ok_or(ConfigError::MissingSigningKey)?;
        Ok(Self {
            db_path: PathBuf::from(db_path_from_env()),
            signing_key_b64,
            token_ttl_days: parsed_env("TOKEN_TTL_DAYS", DEFAULT_TOKEN_TTL_DAYS)?,
            port: parsed_env("PORT", DEFAULT_PORT)?,
        })
    }
}

/// Registry location; also used by the offline operator subcommands that
/// do not need the signing key.
#[must_use]
pub fn db_path_from_env() -> String {
    non_empty_env("LICENSE_DB").unwrap_or_else(|| DEFAULT_DB.to_string())
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_env(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            name,
            value,
        }),
    }
}
