//! In-memory device storage
//!
//! Development fallback used when no `DATABASE_URL` is configured. The
//! counter compare-and-swap is performed under the map shard lock, which is
//! enough to serialize racing authentications against the same record.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use tessera_core::DeviceRecord;

/// Concurrent in-memory map of device records
#[derive(Default)]
pub struct MemoryDeviceStore {
    devices: DashMap<Uuid, DeviceRecord>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_device(&self, id: Uuid) -> Option<DeviceRecord> {
        self.devices.get(&id).map(|entry| entry.value().clone())
    }

    pub fn save_device(&self, device: &DeviceRecord) {
        self.devices.insert(device.id, device.clone());
    }

    /// Store only if the existing record's counter still matches
    /// `expected_counter`; absent records are inserted.
    pub fn save_device_if_counter(&self, device: &DeviceRecord, expected_counter: u32) -> bool {
        match self.devices.entry(device.id) {
            Entry::Occupied(mut entry) => {
                if entry.get().counter != expected_counter {
                    return false;
                }
                entry.insert(device.clone());
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(device.clone());
                true
            }
        }
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl std::fmt::Debug for MemoryDeviceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDeviceStore")
            .field("devices", &self.devices.len())
            .finish()
    }
}
