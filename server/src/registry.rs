//! Durable store of issued licenses and their device activations.
//!
//! Backed by SQLite. The device quota invariant lives here: the
//! check-and-insert for a new activation is a single conditional SQL
//! statement guarded by the `(license_key, device_fingerprint)` unique
//! index, so two racing activations cannot both pass a stale count.

use crate::error::{RegistryError, RegistryResult};
use chrono::{DateTime, Utc};
use kasir_token::{generate_license_key, Tier};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

/// A license row as issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    /// Primary key, human-typable.
    pub license_key: String,
    /// Tier, immutable after issuance.
    pub tier: Tier,
    /// Derived from tier at issuance; never recomputed afterwards.
    pub telegram_allowed: bool,
    /// Derived from tier at issuance.
    pub updates_allowed: bool,
    /// Creation time.
    pub issued_at: DateTime<Utc>,
    /// Expiry, or None for non-expiring tiers.
    pub expires_at: Option<DateTime<Utc>>,
    /// Device quota.
    pub max_devices: u32,
}

impl License {
    /// True if the license is expired at `now`. A null expiry never
    /// expires here.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now > expires)
    }
}

/// Aggregate usage numbers for the operator report.
#[derive(Debug, Clone)]
pub struct UsageStats {
    pub total_licenses: u64,
    pub total_devices: u64,
    pub active_24h: u64,
    pub active_7d: u64,
    /// Per tier: (tier name, license count, device count).
    pub tiers: Vec<(String, u64, u64)>,
}

/// SQLite-backed license registry.
///
/// The connection sits behind a mutex; every operation is a single
/// statement or an implicit transaction on that connection.
pub struct Registry {
    conn: Mutex<Connection>,
}

impl Registry {
    /// Opens (and initializes) the registry at `path`.
    ///
    /// # Errors
    ///
    /// Returns a database error if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> RegistryResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// An in-memory registry (tests).
    ///
    /// # Errors
    ///
    /// Returns a database error if initialization fails.
    pub fn open_in_memory() -> RegistryResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> RegistryResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS licenses (
               license_key      TEXT PRIMARY KEY,
               tier             TEXT NOT NULL,
               telegram_allowed INTEGER NOT NULL,
               updates_allowed  INTEGER NOT NULL,
               issued_at        TEXT NOT NULL,
               expires_at       TEXT,
               max_devices      INTEGER NOT NULL DEFAULT 1
             );
             CREATE TABLE IF NOT EXISTS activations (
               id                 INTEGER PRIMARY KEY AUTOINCREMENT,
               license_key        TEXT NOT NULL,
               device_fingerprint TEXT NOT NULL,
               activated_at       TEXT NOT NULL,
               last_seen          TEXT,
               last_ip            TEXT,
               last_app_version   TEXT,
               UNIQUE(license_key, device_fingerprint)
             );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Issues a new license and returns the stored row.
    ///
    /// Entitlement flags are derived from the tier here, once. Trial
    /// licenses get `now + days` as expiry; other tiers ignore `days`.
    ///
    /// # Errors
    ///
    /// Returns a database error if the insert fails.
    pub fn issue(
        &self,
        tier: Tier,
        days: u32,
        max_devices: u32,
        now: DateTime<Utc>,
    ) -> RegistryResult<License> {
        let flags = tier.flags();
        let expires_at = tier
            .requires_expiry()
            .then(|| now + chrono::Duration::days(i64::from(days)));
        let license = License {
            license_key: generate_license_key(),
            tier,
            telegram_allowed: flags.telegram_allowed,
            updates_allowed: flags.updates_allowed,
            issued_at: now,
            expires_at,
            max_devices,
        };

        let conn = self.lock();
        conn.execute(
            "INSERT INTO licenses
               (license_key, tier, telegram_allowed, updates_allowed, issued_at, expires_at, max_devices)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                license.license_key,
                license.tier.as_str(),
                license.telegram_allowed,
                license.updates_allowed,
                license.issued_at.to_rfc3339(),
                license.expires_at.map(|t| t.to_rfc3339()),
                license.max_devices,
            ],
        )?;
        Ok(license)
    }

    /// Looks up a license by key.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown key.
    pub fn lookup(&self, license_key: &str) -> RegistryResult<License> {
        let conn = self.lock();
        conn.query_row(
            "SELECT license_key, tier, telegram_allowed, updates_allowed,
                    issued_at, expires_at, max_devices
             FROM licenses WHERE license_key = ?1",
            params![license_key],
            license_from_row,
        )
        .optional()?
        .ok_or(RegistryError::NotFound)
    }

    /// Binds `fingerprint` to the license, subject to the device quota.
    ///
    /// Re-registering an already-bound fingerprint is an idempotent
    /// success and never consumes a slot. The quota check and the insert
    /// are one statement; the unique index closes the race window.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DeviceLimitReached`] when the license is
    /// at quota and the fingerprint is new.
    pub fn register_device(
        &self,
        license_key: &str,
        fingerprint: &str,
        max_devices: u32,
        now: DateTime<Utc>,
    ) -> RegistryResult<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR IGNORE INTO activations (license_key, device_fingerprint, activated_at)
             SELECT ?1, ?2, ?3
             WHERE EXISTS (SELECT 1 FROM activations
                           WHERE license_key = ?1 AND device_fingerprint = ?2)
                OR (SELECT COUNT(DISTINCT device_fingerprint) FROM activations
                    WHERE license_key = ?1) < ?4",
            params![license_key, fingerprint, now.to_rfc3339(), max_devices],
        )?;

        let registered: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM activations
                            WHERE license_key = ?1 AND device_fingerprint = ?2)",
            params![license_key, fingerprint],
            |row| row.get(0),
        )?;
        if registered {
            Ok(())
        } else {
            Err(RegistryError::DeviceLimitReached)
        }
    }

    /// Updates heartbeat metadata for an activated device.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotActivated`] if the device was never
    /// registered for that license.
    pub fn touch(
        &self,
        license_key: &str,
        fingerprint: &str,
        now: DateTime<Utc>,
        ip: Option<&str>,
        app_version: Option<&str>,
    ) -> RegistryResult<()> {
        let conn = self.lock();
        let changed = conn.execute(
            "UPDATE activations
             SET last_seen = ?3, last_ip = ?4, last_app_version = ?5
             WHERE license_key = ?1 AND device_fingerprint = ?2",
            params![license_key, fingerprint, now.to_rfc3339(), ip, app_version],
        )?;
        if changed == 0 {
            Err(RegistryError::NotActivated)
        } else {
            Ok(())
        }
    }

    /// Number of distinct devices bound to a license.
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure.
    pub fn device_count(&self, license_key: &str) -> RegistryResult<u32> {
        let conn = self.lock();
        Ok(conn.query_row(
            "SELECT COUNT(DISTINCT device_fingerprint) FROM activations WHERE license_key = ?1",
            params![license_key],
            |row| row.get(0),
        )?)
    }

    /// Aggregate usage report (operator tool).
    ///
    /// # Errors
    ///
    /// Returns a database error on query failure.
    pub fn stats(&self, now: DateTime<Utc>) -> RegistryResult<UsageStats> {
        let conn = self.lock();
        let total_licenses: u64 =
            conn.query_row("SELECT COUNT(*) FROM licenses", [], |row| row.get(0))?;
        let total_devices: u64 =
            conn.query_row("SELECT COUNT(*) FROM activations", [], |row| row.get(0))?;

        let active_since = |cutoff: DateTime<Utc>| -> RegistryResult<u64> {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM activations
                 WHERE COALESCE(last_seen, activated_at) >= ?1",
                params![cutoff.to_rfc3339()],
                |row| row.get(0),
            )?)
        };
        let active_24h = active_since(now - chrono::Duration::hours(24))?;
        let active_7d = active_since(now - chrono::Duration::days(7))?;

        let mut stmt = conn.prepare(
            "SELECT l.tier,
                    COUNT(DISTINCT l.license_key),
                    COUNT(a.device_fingerprint)
             FROM licenses l
             LEFT JOIN activations a ON a.license_key = l.license_key
             GROUP BY l.tier
             ORDER BY l.tier",
        )?;
        let tiers = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UsageStats {
            total_licenses,
            total_devices,
            active_24h,
            active_7d,
            tiers,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn license_from_row(row: &Row<'_>) -> rusqlite::Result<License> {
    let tier_text: String = row.get(1)?;
    let issued_text: String = row.get(4)?;
    let expires_text: Option<String> = row.get(5)?;

    let tier = Tier::from_str(&tier_text).map_err(|_| bad_column(1, &tier_text))?;
    let issued_at = parse_utc(&issued_text).ok_or_else(|| bad_column(4, &issued_text))?;
    let expires_at = match expires_text {
        None => None,
        Some(text) => Some(parse_utc(&text).ok_or_else(|| bad_column(5, &text))?),
    };

    Ok(License {
        license_key: row.get(0)?,
        tier,
        telegram_allowed: row.get(2)?,
        updates_allowed: row.get(3)?,
        issued_at,
        expires_at,
        max_devices: row.get(6)?,
    })
}

fn parse_utc(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn bad_column(index: usize, text: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        format!("unparseable value: {text}").into(),
    )
}
