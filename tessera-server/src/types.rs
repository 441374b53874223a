//! API request/response types
//!
//! Defines the data structures for the device enrollment and authentication
//! endpoints. Token fields carry the raw JSON response string produced by
//! the client-side U2F API; the core validates its structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Response containing a freshly issued challenge
#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengeResponse {
    /// Id of the device record the challenge belongs to
    pub device_id: Uuid,
    /// User-facing prompt to display while waiting for the token
    #[schema(example = "Activate your U2F device")]
    pub prompt: String,
    /// Challenge payload to hand to the client-side U2F API
    #[schema(value_type = Object)]
    pub challenge: Value,
}

/// Request to complete device registration
#[derive(Debug, Deserialize, ToSchema)]
pub struct FinishRegistrationRequest {
    /// Device id from the register/start response
    pub device_id: Uuid,
    /// Raw registration response JSON from the token
    #[schema(example = r#"{"appId":"https://example.com","challenge":"...","clientData":"...","registrationData":"..."}"#)]
    pub token: String,
}

/// Response confirming a completed registration
#[derive(Debug, Serialize, ToSchema)]
pub struct FinishRegistrationResponse {
    pub device_id: Uuid,
    /// Opaque key handle assigned by the device
    pub key_handle: String,
    /// When registration completed
    pub registered_at: Option<DateTime<Utc>>,
}

/// Request to start device authentication
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartAuthenticationRequest {
    /// Id of a registered device record
    pub device_id: Uuid,
}

/// Request to complete device authentication
#[derive(Debug, Deserialize, ToSchema)]
pub struct FinishAuthenticationRequest {
    /// Id of a registered device record
    pub device_id: Uuid,
    /// Raw assertion response JSON from the token
    #[schema(example = r#"{"clientData":"...","keyHandle":"...","signatureData":"..."}"#)]
    pub token: String,
}

/// Outcome of an authentication attempt
///
/// Verification failure is reported here as `verified: false`, never as an
/// HTTP error: wrong signatures and replayed counters must be
/// indistinguishable to the client.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinishAuthenticationResponse {
    pub verified: bool,
    /// The device counter after the attempt
    pub counter: u32,
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status: "healthy" or "degraded"
    pub status: &'static str,
    /// Server version from Cargo.toml
    pub version: &'static str,
    /// Whether device storage survives restarts
    pub persistent_storage: bool,
    /// Service name
    pub service: &'static str,
}

/// Readiness response for orchestration probes
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
}
