//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use tessera_core::{DeviceLifecycle, U2fCrypto};

use crate::config::Config;
use crate::error::ApiError;
use crate::storage::DeviceStorage;

/// Application state containing the lifecycle engine and its collaborators.
#[derive(Clone)]
pub struct AppState {
    /// The core device lifecycle engine
    pub lifecycle: DeviceLifecycle,
    /// Device record storage (shared with the lifecycle engine)
    pub storage: Arc<DeviceStorage>,
    /// App id every enrollment is bound to, derived from the RP origin
    pub app_id: String,
}

impl AppState {
    /// Wire the lifecycle engine to a crypto capability and storage backend.
    pub fn new(crypto: Arc<dyn U2fCrypto>, storage: Arc<DeviceStorage>, app_id: String) -> Self {
        let lifecycle = DeviceLifecycle::new(crypto, storage.clone());
        Self {
            lifecycle,
            storage,
            app_id,
        }
    }

    /// Create state from environment: PostgreSQL storage if `DATABASE_URL`
    /// is set, in-memory otherwise.
    pub async fn from_env(config: &Config, crypto: Arc<dyn U2fCrypto>) -> Result<Self, ApiError> {
        let app_id = config.app_id()?;

        let storage = DeviceStorage::from_env(
            config.database_max_connections,
            config.database_min_connections,
        )
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create device storage: {e}")))?;

        Ok(Self::new(crypto, Arc::new(storage), app_id))
    }

    /// Create state with in-memory storage (for testing)
    pub fn in_memory(crypto: Arc<dyn U2fCrypto>, app_id: impl Into<String>) -> Self {
        Self::new(crypto, Arc::new(DeviceStorage::in_memory()), app_id.into())
    }
}
