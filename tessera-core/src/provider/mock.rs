//! Mock crypto provider for testing.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use sha3::{Digest, Sha3_256};

use super::{Assertion, Challenge, ParsedRegistration, U2fCrypto};
use crate::device::RegistrationInfo;
use crate::error::{DeviceError, Result};

/// Deterministic [`U2fCrypto`] implementation for testing.
/// WARNING: Do not use in production - challenges and signatures are
/// seed-derived, not random!
pub struct MockCrypto {
    seed: u64,
}

impl MockCrypto {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create a mock with default seed for simple tests.
    pub fn default_test() -> Self {
        Self::new(0xDEADBEEF_CAFEBABE)
    }

    fn digest(&self, parts: &[&[u8]]) -> String {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(b"tessera-mock-crypto");
        for part in parts {
            hasher.update(part);
        }
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    fn challenge_value(challenge: &Challenge) -> Result<&str> {
        challenge
            .get("challenge")
            .and_then(Value::as_str)
            .ok_or_else(|| DeviceError::Crypto("challenge payload has no challenge field".into()))
    }

    /// Build a registration token that will verify against `challenge`.
    /// Test helper standing in for a physical device.
    pub fn sign_registration(&self, challenge: &Challenge) -> String {
        let nonce = Self::challenge_value(challenge).unwrap_or_default();
        let app_id = challenge
            .get("appId")
            .and_then(Value::as_str)
            .unwrap_or_default();
        json!({
            "appId": app_id,
            "challenge": nonce,
            "clientData": self.digest(&[b"client-data", nonce.as_bytes()]),
            "registrationData": self.digest(&[b"registration-data", nonce.as_bytes(), app_id.as_bytes()]),
        })
        .to_string()
    }

    /// Build an assertion token reporting `counter`. Test helper standing in
    /// for a physical device; passing a stale counter simulates a clone.
    pub fn sign_assertion(
        &self,
        registration: &RegistrationInfo,
        challenge: &Challenge,
        counter: u32,
        user_present: bool,
    ) -> String {
        let nonce = Self::challenge_value(challenge).unwrap_or_default();
        let signature = self.digest(&[
            b"assertion",
            registration.key_handle.as_bytes(),
            nonce.as_bytes(),
            &counter.to_be_bytes(),
            &[user_present as u8],
        ]);
        json!({
            "clientData": self.digest(&[b"client-data", nonce.as_bytes()]),
            "keyHandle": registration.key_handle,
            "signatureData": format!("{counter:08x}{:02x}{signature}", user_present as u8),
        })
        .to_string()
    }

    fn parse_token(token: &str) -> Result<Value> {
        serde_json::from_str(token).map_err(|e| DeviceError::Crypto(e.to_string()))
    }

    fn field<'a>(token: &'a Value, key: &str) -> Result<&'a str> {
        token
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| DeviceError::Crypto(format!("token field {key} is not a string")))
    }
}

impl Default for MockCrypto {
    fn default() -> Self {
        Self::default_test()
    }
}

impl U2fCrypto for MockCrypto {
    fn start_registration(&self, app_id: &str) -> Result<Challenge> {
        Ok(json!({
            "challenge": self.digest(&[b"register", app_id.as_bytes()]),
            "version": "U2F_V2",
            "appId": app_id,
        }))
    }

    fn complete_registration(
        &self,
        challenge: &Challenge,
        token: &str,
    ) -> Result<ParsedRegistration> {
        let token = Self::parse_token(token)?;
        let nonce = Self::challenge_value(challenge)?;
        let app_id = Self::field(challenge, "appId")?;

        if Self::field(&token, "challenge")? != nonce {
            return Err(DeviceError::Crypto("challenge mismatch".into()));
        }
        if Self::field(&token, "appId")? != app_id {
            return Err(DeviceError::Crypto("appId mismatch".into()));
        }

        let expected =
            self.digest(&[b"registration-data", nonce.as_bytes(), app_id.as_bytes()]);
        if Self::field(&token, "registrationData")? != expected {
            return Err(DeviceError::Crypto("registration data signature invalid".into()));
        }

        Ok(ParsedRegistration {
            key_handle: self.digest(&[b"key-handle", nonce.as_bytes()]),
            public_key: self.digest(&[b"public-key", nonce.as_bytes()]),
            app_id: app_id.to_string(),
            attestation_cert: None,
        })
    }

    fn start_authentication(&self, registration: &RegistrationInfo) -> Result<Challenge> {
        Ok(json!({
            "challenge": self.digest(&[b"authenticate", registration.key_handle.as_bytes()]),
            "version": "U2F_V2",
            "appId": registration.app_id,
            "keyHandle": registration.key_handle,
        }))
    }

    fn verify_authentication(
        &self,
        registration: &RegistrationInfo,
        challenge: &Challenge,
        token: &str,
    ) -> Result<Assertion> {
        let token = Self::parse_token(token)?;
        let nonce = Self::challenge_value(challenge)?;

        if Self::field(&token, "keyHandle")? != registration.key_handle {
            return Err(DeviceError::Crypto("key handle mismatch".into()));
        }

        // Byte-range lookups so a multibyte payload is an error, not a slice
        // panic; the token is untrusted.
        let signature_data = Self::field(&token, "signatureData")?;
        let counter_hex = signature_data
            .get(..8)
            .ok_or_else(|| DeviceError::Crypto("signature data truncated".into()))?;
        let presence = signature_data
            .get(8..10)
            .ok_or_else(|| DeviceError::Crypto("signature data truncated".into()))?;
        let signature = signature_data
            .get(10..)
            .ok_or_else(|| DeviceError::Crypto("signature data truncated".into()))?;

        let counter = u32::from_str_radix(counter_hex, 16)
            .map_err(|e| DeviceError::Crypto(format!("bad counter encoding: {e}")))?;
        let user_present = presence != "00";

        let expected = self.digest(&[
            b"assertion",
            registration.key_handle.as_bytes(),
            nonce.as_bytes(),
            &counter.to_be_bytes(),
            &[user_present as u8],
        ]);
        if signature != expected {
            return Err(DeviceError::Crypto("assertion signature invalid".into()));
        }

        Ok(Assertion {
            counter,
            user_present,
        })
    }
}
