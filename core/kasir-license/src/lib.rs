//! Client trust cache and enforcement gate for kasir licensing.
//!
//! This crate is the only licensing dependency of the host application. It
//! handles:
//! - Device fingerprinting for license binding
//! - Local persistence of the operator-entered key and the last verified
//!   signed token (two independent files)
//! - Offline token verification against the distributed public key
//! - Online activation and throttled heartbeat pings (best-effort)
//! - The per-request enforcement gate decision
//!
//! # Design Principles
//!
//! - **Offline-first**: within the token TTL the store runs with no network
//!   access at all; only the embedded public key is consulted
//! - **Fail closed, but never brick**: ambiguous or corrupted state denies
//!   access, while a failed refresh never deletes a still-valid-looking
//!   token or the entered key
//! - **No exceptions across the boundary**: every public decision path
//!   returns a [`LicenseStatus`] value, never an error

mod device;
mod error;
mod gate;
mod manager;
mod status;
mod store;

pub use device::{default_provider, FingerprintProvider, FixedFingerprint, MachineFingerprint};
pub use error::{LicenseError, LicenseResult};
pub use gate::{Gate, GateConfig, GateDecision};
pub use manager::{ClientConfig, LicenseManager, PING_INTERVAL_SECS};
pub use status::LicenseStatus;
pub use store::{ActivationStore, StoredActivation};
