//! Device record storage
//!
//! Provides the persistence collaborator the core lifecycle engine consumes:
//! - **PostgreSQL** (production): device records survive restarts, and the
//!   counter compare-and-swap is a conditional `UPDATE`.
//! - **In-memory** (development fallback): a concurrent map, used when
//!   `DATABASE_URL` is not set. Records are lost on restart.

mod memory;
mod postgres;

pub use memory::MemoryDeviceStore;
pub use postgres::PostgresDeviceStore;

use async_trait::async_trait;
use uuid::Uuid;

use tessera_core::{DeviceError, DeviceRecord, DeviceStore};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),
}

impl From<StorageError> for DeviceError {
    fn from(err: StorageError) -> Self {
        DeviceError::Store(err.to_string())
    }
}

/// Storage backend selection
enum Backend {
    /// PostgreSQL storage (production)
    Postgres(PostgresDeviceStore),
    /// In-memory storage (development fallback)
    Memory(MemoryDeviceStore),
}

/// Unified device storage, selected at startup.
pub struct DeviceStorage {
    backend: Backend,
}

impl DeviceStorage {
    /// Create storage with PostgreSQL backend
    pub async fn with_postgres(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StorageError> {
        let pg_store =
            PostgresDeviceStore::new(database_url, max_connections, min_connections).await?;
        pg_store.migrate().await?;

        Ok(Self {
            backend: Backend::Postgres(pg_store),
        })
    }

    /// Create storage with in-memory backend (development only)
    pub fn in_memory() -> Self {
        tracing::warn!("Using in-memory device storage - enrollments will be lost on restart!");
        Self {
            backend: Backend::Memory(MemoryDeviceStore::new()),
        }
    }

    /// Create storage from environment
    ///
    /// Uses PostgreSQL if `DATABASE_URL` is set, otherwise falls back to
    /// in-memory.
    pub async fn from_env(
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StorageError> {
        match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => {
                tracing::info!("Using PostgreSQL device storage");
                Self::with_postgres(&url, max_connections, min_connections).await
            }
            _ => {
                tracing::warn!("DATABASE_URL not set, using in-memory storage");
                Ok(Self::in_memory())
            }
        }
    }

    /// Check if using persistent storage
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, Backend::Postgres(_))
    }

    /// Check database health (always Ok for memory backend)
    pub async fn check_health(&self) -> Result<(), StorageError> {
        match &self.backend {
            Backend::Postgres(pg) => pg.check_health().await,
            Backend::Memory(_) => Ok(()),
        }
    }

    /// Fetch a device record by id
    pub async fn get_device(&self, id: Uuid) -> Result<Option<DeviceRecord>, StorageError> {
        match &self.backend {
            Backend::Postgres(pg) => pg.get_device(id).await,
            Backend::Memory(mem) => Ok(mem.get_device(id)),
        }
    }

    /// Total number of stored device records
    pub async fn device_count(&self) -> Result<usize, StorageError> {
        match &self.backend {
            Backend::Postgres(pg) => pg.device_count().await,
            Backend::Memory(mem) => Ok(mem.device_count()),
        }
    }
}

#[async_trait]
impl DeviceStore for DeviceStorage {
    async fn save(&self, device: &DeviceRecord) -> tessera_core::Result<()> {
        match &self.backend {
            Backend::Postgres(pg) => pg.save_device(device).await.map_err(Into::into),
            Backend::Memory(mem) => {
                mem.save_device(device);
                Ok(())
            }
        }
    }

    async fn save_if_counter(
        &self,
        device: &DeviceRecord,
        expected_counter: u32,
    ) -> tessera_core::Result<bool> {
        match &self.backend {
            Backend::Postgres(pg) => pg
                .save_device_if_counter(device, expected_counter)
                .await
                .map_err(Into::into),
            Backend::Memory(mem) => Ok(mem.save_device_if_counter(device, expected_counter)),
        }
    }
}

impl std::fmt::Debug for DeviceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.backend {
            Backend::Postgres(_) => "PostgreSQL",
            Backend::Memory(_) => "Memory",
        };
        f.debug_struct("DeviceStorage")
            .field("backend", &backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_storage_round_trip() {
        let storage = DeviceStorage::in_memory();
        assert!(!storage.is_persistent());

        let device = DeviceRecord::new_enrollment("https://example.com");
        storage.save(&device).await.unwrap();
        assert_eq!(storage.get_device(device.id).await.unwrap(), Some(device));
        assert_eq!(storage.device_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_counter_cas() {
        let storage = DeviceStorage::in_memory();
        let mut device = DeviceRecord::new_enrollment("https://example.com");
        device.counter = 3;
        storage.save(&device).await.unwrap();

        device.counter = 4;
        assert!(storage.save_if_counter(&device, 3).await.unwrap());
        assert!(!storage.save_if_counter(&device, 3).await.unwrap());
    }
}
