//! Challenge serialization boundary.
//!
//! Challenges are produced and consumed opaquely by the crypto provider; this
//! codec only carries them across the persistence boundary as a string. The
//! round trip is deterministic and lossless.

use serde_json::Value;

use crate::error::{DeviceError, Result};

/// Serialize a challenge for storage in a device record.
pub fn encode(challenge: &Value) -> Result<String> {
    serde_json::to_string(challenge).map_err(|e| DeviceError::Codec(e.to_string()))
}

/// Deserialize a previously stored challenge.
///
/// Decode failures are faults, not untrusted-input errors: the stored string
/// was produced by [`encode`] on our side of the boundary.
pub fn decode(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| DeviceError::Codec(e.to_string()))
}
