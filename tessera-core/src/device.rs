//! Device record and registration view.
//!
//! A [`DeviceRecord`] is the persistent entity for one enrolled (or pending)
//! hardware token. It is created empty by the account-management layer and
//! driven through registration and authentication by
//! [`DeviceLifecycle`](crate::DeviceLifecycle).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{DeviceError, Result};

/// Persistent record for a single U2F device.
///
/// Invariants maintained by the lifecycle engine:
/// - the device is registered iff `key_handle`, `public_key` and `app_id`
///   are all non-empty;
/// - `counter` never decreases across successful authentications;
/// - at most one challenge is outstanding at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Storage key for this record.
    pub id: Uuid,
    /// Opaque reference to the private key, returned by the device during
    /// registration.
    pub key_handle: String,
    /// Public key corresponding to the key handle, returned by the device
    /// during registration.
    pub public_key: String,
    /// Our origin, sent to the device during registration and authentication.
    /// Immutable after first use.
    pub app_id: String,
    /// The non-volatile authentication count last returned by the device.
    pub counter: u32,
    /// The last challenge we generated for this device, if one is pending.
    pub challenge: Option<String>,
    /// When the device completed registration.
    pub registered_at: Option<DateTime<Utc>>,
    /// When the device last successfully authenticated.
    pub last_auth_at: Option<DateTime<Utc>>,
}

impl DeviceRecord {
    /// Create an empty pending enrollment bound to an app id.
    pub fn new_enrollment(app_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key_handle: String::new(),
            public_key: String::new(),
            app_id: app_id.into(),
            counter: 0,
            challenge: None,
            registered_at: None,
            last_auth_at: None,
        }
    }

    /// A device is registered once all three identity fields are populated.
    pub fn is_registered(&self) -> bool {
        !self.key_handle.is_empty() && !self.public_key.is_empty() && !self.app_id.is_empty()
    }

    /// The registration view handed to the crypto provider for
    /// authentication.
    pub fn registration(&self) -> Result<RegistrationInfo> {
        if !self.is_registered() {
            return Err(DeviceError::NotRegistered);
        }
        Ok(RegistrationInfo {
            key_handle: self.key_handle.clone(),
            public_key: self.public_key.clone(),
            app_id: self.app_id.clone(),
        })
    }
}

/// The `{keyHandle, publicKey, appId}` triple identifying an enrolled key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationInfo {
    #[serde(rename = "keyHandle")]
    pub key_handle: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    #[serde(rename = "appId")]
    pub app_id: String,
}

/// Derive the app id (U2F application identity) from a request origin.
///
/// U2F requires a secure connection: any non-https origin is rejected with
/// [`DeviceError::InsecureOrigin`], never downgraded.
pub fn derive_app_id(origin: &Url) -> Result<String> {
    if origin.scheme() != "https" {
        return Err(DeviceError::InsecureOrigin(origin.to_string()));
    }

    let host = origin
        .host_str()
        .ok_or_else(|| DeviceError::InsecureOrigin(origin.to_string()))?;

    Ok(match origin.port() {
        Some(port) => format!("https://{host}:{port}"),
        None => format!("https://{host}"),
    })
}
