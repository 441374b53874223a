//! Persistence capability consumed by the lifecycle engine.
//!
//! The engine never owns storage; callers supply a [`DeviceStore`]. The one
//! non-obvious requirement is [`DeviceStore::save_if_counter`]: the counter
//! check and the subsequent update must be a single atomic step relative to
//! concurrent authentications for the same device, so backends implement an
//! update-if-counter-unchanged compare-and-swap (SQL `WHERE counter = $n`,
//! or a lock over the whole operation in memory).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::device::DeviceRecord;
use crate::error::{DeviceError, Result};

#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Persist the record unconditionally.
    async fn save(&self, device: &DeviceRecord) -> Result<()>;

    /// Persist the record only if the stored counter still equals
    /// `expected_counter`. Returns false when a concurrent writer advanced
    /// the counter first; the caller must treat that as a failed
    /// authentication, not retry the write.
    async fn save_if_counter(&self, device: &DeviceRecord, expected_counter: u32) -> Result<bool>;
}

/// Mutex-guarded in-memory store.
///
/// Development and test backend; records are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    devices: Mutex<HashMap<Uuid, DeviceRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a copy of a stored record.
    pub fn load(&self, id: Uuid) -> Result<Option<DeviceRecord>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, DeviceRecord>>> {
        self.devices
            .lock()
            .map_err(|_| DeviceError::Store("device map poisoned".into()))
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn save(&self, device: &DeviceRecord) -> Result<()> {
        self.lock()?.insert(device.id, device.clone());
        Ok(())
    }

    async fn save_if_counter(&self, device: &DeviceRecord, expected_counter: u32) -> Result<bool> {
        let mut devices = self.lock()?;

        if let Some(existing) = devices.get(&device.id) {
            if existing.counter != expected_counter {
                return Ok(false);
            }
        }
        devices.insert(device.id, device.clone());
        Ok(true)
    }
}
