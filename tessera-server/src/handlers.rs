//! HTTP endpoint handlers
//!
//! Implements the registration and authentication flows plus health probes.
//! Each flow is two requests: `start` issues a challenge the caller relays
//! to the token device, `finish` submits the token's response.

use axum::{extract::State, Json};
use serde_json::Value;
use uuid::Uuid;

use tessera_core::{codec, DeviceRecord, RegistrationPersistence};

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{
    ChallengeResponse, FinishAuthenticationRequest, FinishAuthenticationResponse,
    FinishRegistrationRequest, FinishRegistrationResponse, HealthResponse, ReadyResponse,
    StartAuthenticationRequest,
};

/// POST /devices/register/start
///
/// Create a pending enrollment bound to the relying party's app id and issue
/// its registration challenge. The record is persisted immediately so the
/// finish request can load it.
#[utoipa::path(
    post,
    path = "/devices/register/start",
    tag = "Registration",
    responses(
        (status = 200, description = "Registration challenge created", body = ChallengeResponse),
        (status = 500, description = "Failed to generate challenge")
    )
)]
pub async fn start_registration(
    State(state): State<AppState>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let mut device = DeviceRecord::new_enrollment(state.app_id.clone());

    let prompt = state
        .lifecycle
        .start_registration(&mut device, RegistrationPersistence::Immediate)
        .await?;

    tracing::info!(device_id = %device.id, "Registration started");

    Ok(Json(ChallengeResponse {
        device_id: device.id,
        prompt: prompt.to_string(),
        challenge: issued_challenge(&device)?,
    }))
}

/// POST /devices/register/finish
///
/// Complete registration with the token's response. The pending challenge
/// survives a failed attempt; call register/start again to abandon it.
#[utoipa::path(
    post,
    path = "/devices/register/finish",
    tag = "Registration",
    request_body = FinishRegistrationRequest,
    responses(
        (status = 200, description = "Registration completed", body = FinishRegistrationResponse),
        (status = 400, description = "Response token is malformed or invalid"),
        (status = 404, description = "Unknown device"),
        (status = 409, description = "Device already registered or no challenge outstanding")
    )
)]
pub async fn finish_registration(
    State(state): State<AppState>,
    Json(req): Json<FinishRegistrationRequest>,
) -> Result<Json<FinishRegistrationResponse>, ApiError> {
    let mut device = load_device(&state, req.device_id).await?;

    state
        .lifecycle
        .complete_registration(&mut device, &req.token, RegistrationPersistence::Immediate)
        .await?;

    Ok(Json(FinishRegistrationResponse {
        device_id: device.id,
        key_handle: device.key_handle.clone(),
        registered_at: device.registered_at,
    }))
}

/// POST /devices/authenticate/start
///
/// Issue an authentication challenge for a registered device. The challenge
/// is persisted synchronously before the response is returned.
#[utoipa::path(
    post,
    path = "/devices/authenticate/start",
    tag = "Authentication",
    request_body = StartAuthenticationRequest,
    responses(
        (status = 200, description = "Authentication challenge created", body = ChallengeResponse),
        (status = 404, description = "Unknown device"),
        (status = 409, description = "Device is not registered")
    )
)]
pub async fn start_authentication(
    State(state): State<AppState>,
    Json(req): Json<StartAuthenticationRequest>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let mut device = load_device(&state, req.device_id).await?;

    let prompt = state.lifecycle.start_authentication(&mut device).await?;

    Ok(Json(ChallengeResponse {
        device_id: device.id,
        prompt: prompt.to_string(),
        challenge: issued_challenge(&device)?,
    }))
}

/// POST /devices/authenticate/finish
///
/// Verify the token's assertion. A failed verification - wrong signature or
/// replayed counter alike - is `verified: false` with status 200; only
/// out-of-order calls and malformed payloads produce error statuses.
#[utoipa::path(
    post,
    path = "/devices/authenticate/finish",
    tag = "Authentication",
    request_body = FinishAuthenticationRequest,
    responses(
        (status = 200, description = "Attempt processed", body = FinishAuthenticationResponse),
        (status = 400, description = "Response token is structurally invalid"),
        (status = 404, description = "Unknown device"),
        (status = 409, description = "Device not registered or no challenge outstanding")
    )
)]
pub async fn finish_authentication(
    State(state): State<AppState>,
    Json(req): Json<FinishAuthenticationRequest>,
) -> Result<Json<FinishAuthenticationResponse>, ApiError> {
    let mut device = load_device(&state, req.device_id).await?;

    let verified = state
        .lifecycle
        .complete_authentication(&mut device, &req.token)
        .await?;

    Ok(Json(FinishAuthenticationResponse {
        verified,
        counter: device.counter,
    }))
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status, version, and storage health. Used for
/// monitoring and load balancer health checks.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let storage_ok = state.storage.check_health().await.is_ok();

    Json(HealthResponse {
        status: if storage_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        persistent_storage: state.storage.is_persistent(),
        service: "tessera-server",
    })
}

/// GET /ready - Readiness probe
///
/// Unlike /health, this is a simple yes/no check.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses((status = 200, description = "Service readiness", body = ReadyResponse))
)]
pub async fn ready() -> Json<ReadyResponse> {
    Json(ReadyResponse { ready: true })
}

async fn load_device(state: &AppState, id: Uuid) -> Result<DeviceRecord, ApiError> {
    state
        .storage
        .get_device(id)
        .await
        .map_err(|e| ApiError::internal(format!("Storage error: {e}")))?
        .ok_or_else(|| ApiError::not_found(format!("Unknown device: {id}")))
}

fn issued_challenge(device: &DeviceRecord) -> Result<Value, ApiError> {
    let raw = device
        .challenge
        .as_deref()
        .ok_or_else(|| ApiError::internal("Challenge missing after issuance"))?;
    Ok(codec::decode(raw)?)
}
