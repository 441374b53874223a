use thiserror::Error;

/// Errors raised by the device lifecycle engine.
///
/// The variants fall into three groups with different handling contracts:
///
/// - Caller misuse (`AlreadyRegistered`, `NotRegistered`, `MissingAppId`,
///   `MissingChallenge`): always propagated, never swallowed.
/// - Untrusted-input validation (`MalformedResponse`, `ProtocolError`,
///   `MissingFields`, `InvalidToken`): recoverable, carry field-level detail
///   suitable for user display.
/// - Infrastructure (`InsecureOrigin`, `Codec`, `Crypto`, `Store`):
///   configuration or collaborator failures.
///
/// Cryptographic verification failure during authentication completion is
/// deliberately NOT an error: it surfaces as `Ok(false)` from
/// `DeviceLifecycle::complete_authentication` so the failure shape is
/// identical for a wrong signature and a replayed counter.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("This device is already registered")]
    AlreadyRegistered,

    #[error("This device has not been properly registered")]
    NotRegistered,

    #[error("An app_id is required to register a device")]
    MissingAppId,

    #[error("This device has not generated a challenge")]
    MissingChallenge,

    #[error("Response is not a JSON object: {0}")]
    MalformedResponse(String),

    #[error("Response contains an errorCode: {code}")]
    ProtocolError { code: String },

    #[error("Response is missing required keys: {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("The registration response is not valid: {0}")]
    InvalidToken(String),

    #[error("App ID requires a secure (https) origin, got: {0}")]
    InsecureOrigin(String),

    #[error("Challenge codec error: {0}")]
    Codec(String),

    #[error("Crypto provider error: {0}")]
    Crypto(String),

    #[error("Device store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
