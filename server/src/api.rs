//! HTTP activation protocol: activate, ping, health.
//!
//! Both endpoints are stateless per request aside from registry side
//! effects, and effectively idempotent. Activation is the only path that
//! issues a signed token; ping only refreshes heartbeat metadata.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::{Extension, Json};
use chrono::Utc;
use kasir_token::{SignedToken, TokenPayload};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Activation request body.
#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    #[serde(default)]
    pub license_key: String,
    #[serde(default)]
    pub device_fingerprint: String,
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub app_version: String,
}

/// Ping request body.
#[derive(Debug, Deserialize)]
pub struct PingRequest {
    #[serde(default)]
    pub license_key: String,
    #[serde(default)]
    pub device_fingerprint: String,
    #[serde(default)]
    pub app_version: String,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub ok: bool,
}

/// POST /api/activate
///
/// Looks up the license, rejects expired ones, binds the device under the
/// quota, refreshes heartbeat metadata and returns a freshly signed
/// entitlement token. Entitlement flags come from the stored license row;
/// nothing client-supplied is trusted.
pub async fn activate(
    State(state): State<AppState>,
    connect: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
    Json(body): Json<ActivateRequest>,
) -> Result<Json<SignedToken>, ApiError> {
    let license_key = body.license_key.trim();
    let fingerprint = body.device_fingerprint.trim();
    if license_key.is_empty() || fingerprint.is_empty() {
        return Err(ApiError::BadRequest(
            "license_key and device_fingerprint required".to_string(),
        ));
    }

    let now = Utc::now();
    let license = state.registry.lookup(license_key)?;
    if license.is_expired(now) {
        tracing::info!(license_key, "activation refused: license expired");
        return Err(ApiError::Forbidden("license expired".to_string()));
    }

    state
        .registry
        .register_device(license_key, fingerprint, license.max_devices, now)?;
    state.registry.touch(
        license_key,
        fingerprint,
        now,
        client_ip(&headers, connect.as_ref()).as_deref(),
        non_empty(&body.app_version),
    )?;

    let payload = TokenPayload {
        license_key: license.license_key.clone(),
        tier: license.tier,
        telegram_allowed: license.telegram_allowed,
        updates_allowed: license.updates_allowed,
        device_fingerprint: fingerprint.to_string(),
        issued_at: license.issued_at,
        expires_at: license.expires_at,
        iat: now.timestamp(),
        exp: (now + chrono::Duration::days(state.token_ttl_days)).timestamp(),
    };
    let token = state.authority.sign(&payload).map_err(|e| {
        tracing::error!("token signing failed: {e}");
        ApiError::Internal
    })?;

    tracing::info!(
        license_key,
        tier = %license.tier,
        app = %body.app,
        "device activated"
    );
    Ok(Json(token))
}

/// POST /api/ping
///
/// Heartbeat for an already-activated device. Never creates a binding and
/// never issues a token.
pub async fn ping(
    State(state): State<AppState>,
    connect: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
    Json(body): Json<PingRequest>,
) -> Result<Json<Ack>, ApiError> {
    let license_key = body.license_key.trim();
    let fingerprint = body.device_fingerprint.trim();
    if license_key.is_empty() || fingerprint.is_empty() {
        return Err(ApiError::BadRequest(
            "license_key and device_fingerprint required".to_string(),
        ));
    }

    state.registry.touch(
        license_key,
        fingerprint,
        Utc::now(),
        client_ip(&headers, connect.as_ref()).as_deref(),
        non_empty(&body.app_version),
    )?;
    Ok(Json(Ack { ok: true }))
}

/// GET /health
pub async fn health() -> Json<Ack> {
    Json(Ack { ok: true })
}

/// Proxy-aware client address: first X-Forwarded-For entry, else the
/// socket peer. The peer address arrives as a request extension only when
/// the server runs with connect info wired in.
fn client_ip(
    headers: &HeaderMap,
    connect: Option<&Extension<ConnectInfo<SocketAddr>>>,
) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| connect.map(|Extension(ConnectInfo(addr))| addr.ip().to_string()))
}

fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
