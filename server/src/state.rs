//! Shared handler state.

use crate::registry::Registry;
use kasir_token::SigningAuthority;
use std::sync::Arc;

/// State threaded through the activation handlers.
#[derive(Clone)]
pub struct AppState {
    /// The license registry.
    pub registry: Arc<Registry>,
    /// The signing authority holding the private key.
    pub authority: Arc<SigningAuthority>,
    /// Token TTL in days (`exp = iat + TTL`). Kept short so revoked or
    /// expired licenses surface client-side without server contact.
    pub token_ttl_days: i64,
}
