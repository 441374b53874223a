//! Structural pre-validation of client-supplied token responses.
//!
//! Untrusted payloads are checked for shape before any cryptographic work:
//! a response must be a JSON object, must not carry a device-reported
//! `errorCode`, and must contain every key the operation requires.

use serde_json::{Map, Value};

use crate::error::{DeviceError, Result};

/// Which lifecycle operation a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Registration,
    Authentication,
}

/// Keys a registration response must carry.
pub const REQUIRED_REGISTER_KEYS: [&str; 4] =
    ["appId", "challenge", "clientData", "registrationData"];

/// Keys an authentication response must carry.
pub const REQUIRED_AUTHENTICATE_KEYS: [&str; 3] = ["clientData", "keyHandle", "signatureData"];

impl ResponseKind {
    fn required_keys(self) -> &'static [&'static str] {
        match self {
            Self::Registration => &REQUIRED_REGISTER_KEYS,
            Self::Authentication => &REQUIRED_AUTHENTICATE_KEYS,
        }
    }
}

/// Validate the structure of a raw token response.
///
/// Returns the parsed object on success so callers never parse twice.
pub fn validate_response(raw: &str, kind: ResponseKind) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| DeviceError::MalformedResponse(e.to_string()))?;

    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(DeviceError::MalformedResponse(format!(
                "expected an object, got {}",
                type_name(&other)
            )))
        }
    };

    if let Some(code) = object.get("errorCode") {
        return Err(DeviceError::ProtocolError {
            code: code.to_string(),
        });
    }

    let missing: Vec<String> = kind
        .required_keys()
        .iter()
        .filter(|key| !object.contains_key(**key))
        .map(|key| (*key).to_string())
        .collect();

    if !missing.is_empty() {
        return Err(DeviceError::MissingFields { fields: missing });
    }

    Ok(object)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
