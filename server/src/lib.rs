//! Activation server and license registry for kasir.
//!
//! The server is the trust root of the licensing system: it owns the
//! Ed25519 private key, the durable license registry and the two-endpoint
//! activation protocol (`/api/activate`, `/api/ping`). Everything a
//! client receives from here is re-verified client-side against the
//! independently distributed public key.

mod api;
mod config;
mod error;
mod registry;
mod state;

pub use api::{activate, health, ping, Ack, ActivateRequest, PingRequest};
pub use config::{db_path_from_env, ConfigError, ServerConfig, DEFAULT_TOKEN_TTL_DAYS};
pub use error::{ApiError, RegistryError, RegistryResult};
pub use registry::{License, Registry, UsageStats};
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;

/// Builds the activation protocol router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/activate", post(activate))
        .route("/api/ping", post(ping))
        .route("/health", get(health))
        .with_state(state)
}
