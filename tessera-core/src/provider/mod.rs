//! Cryptographic capability consumed by the lifecycle engine.
//!
//! The core never implements ECDSA or X.509 itself: challenge generation,
//! registration parsing and assertion verification are supplied behind
//! [`U2fCrypto`] by a trusted library. Keeping the seam a trait object makes
//! the engine testable with a deterministic provider and lets deployments
//! substitute implementations without touching the lifecycle.

mod mock;

pub use mock::MockCrypto;

use serde_json::Value;

use crate::device::RegistrationInfo;
use crate::error::Result;

/// Opaque challenge payload, produced and consumed by the provider.
///
/// The engine only serializes it (see [`codec`](crate::codec)); it never
/// inspects the contents.
pub type Challenge = Value;

/// Result of parsing a registration response.
#[derive(Debug, Clone)]
pub struct ParsedRegistration {
    /// Opaque key handle for the newly enrolled key.
    pub key_handle: String,
    /// Public key material for the key handle.
    pub public_key: String,
    /// Application id the key is bound to.
    pub app_id: String,
    /// Attestation certificate presented by the device, if any. Carried
    /// opaquely; validating it is outside the engine's scope.
    pub attestation_cert: Option<Vec<u8>>,
}

/// Result of verifying an authentication response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assertion {
    /// The device's non-volatile usage counter.
    pub counter: u32,
    /// Whether the device asserted physical user presence.
    pub user_present: bool,
}

/// The challenge-response crypto operations.
///
/// All methods are local computation; implementations must not block on
/// network I/O. Failures are [`DeviceError::Crypto`](crate::DeviceError).
pub trait U2fCrypto: Send + Sync {
    /// Produce a fresh registration challenge bound to an app id.
    fn start_registration(&self, app_id: &str) -> Result<Challenge>;

    /// Parse and verify a registration response against its challenge.
    fn complete_registration(&self, challenge: &Challenge, token: &str)
        -> Result<ParsedRegistration>;

    /// Produce a fresh authentication challenge for an enrolled key.
    fn start_authentication(&self, registration: &RegistrationInfo) -> Result<Challenge>;

    /// Verify an assertion against its challenge and enrolled key.
    fn verify_authentication(
        &self,
        registration: &RegistrationInfo,
        challenge: &Challenge,
        token: &str,
    ) -> Result<Assertion>;
}
