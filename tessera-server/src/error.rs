//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error
//! variants, plus the HTTP mapping for core lifecycle errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tessera_core::DeviceError;
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error - unexpected server-side failure
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable - required collaborator is not configured
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Lifecycle error from the core engine
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Device(ref e) => match e {
                // Out-of-order lifecycle calls → 409
                DeviceError::AlreadyRegistered
                | DeviceError::NotRegistered
                | DeviceError::MissingChallenge => StatusCode::CONFLICT,

                // Untrusted client input → 400
                DeviceError::MalformedResponse(_)
                | DeviceError::ProtocolError { .. }
                | DeviceError::MissingFields { .. }
                | DeviceError::InvalidToken(_) => StatusCode::BAD_REQUEST,

                // Server-side configuration or collaborator failures → 500
                DeviceError::MissingAppId
                | DeviceError::InsecureOrigin(_)
                | DeviceError::Codec(_)
                | DeviceError::Crypto(_)
                | DeviceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Device(ref e) => match e {
                DeviceError::AlreadyRegistered => "ALREADY_REGISTERED",
                DeviceError::NotRegistered => "NOT_REGISTERED",
                DeviceError::MissingAppId => "MISSING_APP_ID",
                DeviceError::MissingChallenge => "MISSING_CHALLENGE",
                DeviceError::MalformedResponse(_) => "MALFORMED_RESPONSE",
                DeviceError::ProtocolError { .. } => "PROTOCOL_ERROR",
                DeviceError::MissingFields { .. } => "MISSING_FIELDS",
                DeviceError::InvalidToken(_) => "INVALID_TOKEN",
                DeviceError::InsecureOrigin(_) => "INSECURE_ORIGIN",
                DeviceError::Codec(_) => "CODEC_ERROR",
                DeviceError::Crypto(_) => "CRYPTO_ERROR",
                DeviceError::Store(_) => "STORAGE_ERROR",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Untrusted-input errors carry field-level detail intended for
            // user display; internal failures are sanitized.
            Self::Device(ref e) => match e {
                DeviceError::Codec(_) => "Challenge serialization error".to_string(),
                DeviceError::Crypto(_) => "Crypto provider failure".to_string(),
                DeviceError::Store(_) => "Device storage failure".to_string(),
                DeviceError::InsecureOrigin(_) | DeviceError::MissingAppId => {
                    "Relying party origin is misconfigured".to_string()
                }
                other => other.to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal",
            Self::ServiceUnavailable(_) => "service_unavailable",
            Self::Device(_) => "device",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        // All error responses include a `code` field for programmatic handling
        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_faults_are_conflicts() {
        assert_eq!(
            ApiError::from(DeviceError::AlreadyRegistered).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(DeviceError::MissingChallenge).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_validation_faults_are_bad_requests() {
        let err = ApiError::from(DeviceError::MissingFields {
            fields: vec!["clientData".into()],
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "MISSING_FIELDS");
        assert!(err.client_message().contains("clientData"));
    }

    #[test]
    fn test_internal_detail_is_sanitized() {
        let err = ApiError::from(DeviceError::Store("password=hunter2 leaked".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.client_message().contains("hunter2"));
    }
}
