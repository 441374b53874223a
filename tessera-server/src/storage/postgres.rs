//! PostgreSQL storage for device records
//!
//! The counter compare-and-swap required by the core lifecycle maps to a
//! conditional `UPDATE ... WHERE counter = $expected`; `rows_affected` tells
//! us whether we won the race.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use tessera_core::DeviceRecord;

use super::StorageError;

/// PostgreSQL-backed device storage
pub struct PostgresDeviceStore {
    pool: PgPool,
}

impl PostgresDeviceStore {
    /// Create a new PostgreSQL device store
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        tracing::info!("Connected to PostgreSQL database");
        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        tracing::info!("Database migrations completed");
        Ok(())
    }

    /// Check database connection health
    pub async fn check_health(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }

    /// Fetch a device record by id
    pub async fn get_device(&self, id: Uuid) -> Result<Option<DeviceRecord>, StorageError> {
        let row = sqlx::query_as::<_, DeviceRow>(
            r#"
            SELECT id, key_handle, public_key, app_id, counter, challenge,
                   registered_at, last_auth_at
            FROM u2f_devices
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        row.map(DeviceRow::into_record).transpose()
    }

    /// Insert or replace a device record
    pub async fn save_device(&self, device: &DeviceRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO u2f_devices
                (id, key_handle, public_key, app_id, counter, challenge,
                 registered_at, last_auth_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                key_handle = EXCLUDED.key_handle,
                public_key = EXCLUDED.public_key,
                app_id = EXCLUDED.app_id,
                counter = EXCLUDED.counter,
                challenge = EXCLUDED.challenge,
                registered_at = EXCLUDED.registered_at,
                last_auth_at = EXCLUDED.last_auth_at
            "#,
        )
        .bind(device.id)
        .bind(&device.key_handle)
        .bind(&device.public_key)
        .bind(&device.app_id)
        .bind(i64::from(device.counter))
        .bind(&device.challenge)
        .bind(device.registered_at)
        .bind(device.last_auth_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }

    /// Update a device record only if the stored counter still equals
    /// `expected_counter`; inserts the record if it does not exist yet.
    pub async fn save_device_if_counter(
        &self,
        device: &DeviceRecord,
        expected_counter: u32,
    ) -> Result<bool, StorageError> {
        let updated = sqlx::query(
            r#"
            UPDATE u2f_devices
            SET key_handle = $2, public_key = $3, app_id = $4, counter = $5,
                challenge = $6, registered_at = $7, last_auth_at = $8
            WHERE id = $1 AND counter = $9
            "#,
        )
        .bind(device.id)
        .bind(&device.key_handle)
        .bind(&device.public_key)
        .bind(&device.app_id)
        .bind(i64::from(device.counter))
        .bind(&device.challenge)
        .bind(device.registered_at)
        .bind(device.last_auth_at)
        .bind(i64::from(expected_counter))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        if updated.rows_affected() > 0 {
            return Ok(true);
        }

        // Either the record is absent (first save wins) or a concurrent
        // writer advanced the counter (we lose).
        let inserted = sqlx::query(
            r#"
            INSERT INTO u2f_devices
                (id, key_handle, public_key, app_id, counter, challenge,
                 registered_at, last_auth_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(device.id)
        .bind(&device.key_handle)
        .bind(&device.public_key)
        .bind(&device.app_id)
        .bind(i64::from(device.counter))
        .bind(&device.challenge)
        .bind(device.registered_at)
        .bind(device.last_auth_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(inserted.rows_affected() > 0)
    }

    /// Get total device count (for stats)
    pub async fn device_count(&self) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM u2f_devices")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(count as usize)
    }
}

/// Database row for device records
#[derive(sqlx::FromRow)]
struct DeviceRow {
    id: Uuid,
    key_handle: String,
    public_key: String,
    app_id: String,
    counter: i64,
    challenge: Option<String>,
    registered_at: Option<chrono::DateTime<chrono::Utc>>,
    last_auth_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl DeviceRow {
    /// A counter outside u32 range means the row is corrupted (the schema
    /// CHECK forbids it); surface that instead of clamping.
    fn into_record(self) -> Result<DeviceRecord, StorageError> {
        let counter = u32::try_from(self.counter).map_err(|_| {
            StorageError::Query(format!(
                "stored counter {} for device {} is out of range",
                self.counter, self.id
            ))
        })?;

        Ok(DeviceRecord {
            id: self.id,
            key_handle: self.key_handle,
            public_key: self.public_key,
            app_id: self.app_id,
            counter,
            challenge: self.challenge,
            registered_at: self.registered_at,
            last_auth_at: self.last_auth_at,
        })
    }
}

impl std::fmt::Debug for PostgresDeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDeviceStore")
            .field("pool", &"<PgPool>")
            .finish()
    }
}
