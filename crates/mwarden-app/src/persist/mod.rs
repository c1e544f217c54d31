//! Durable device storage and the debounced write-back queue
//!
//! [`DeviceStorage`] is the contract the engine persists through;
//! [`FileDeviceStorage`] is the JSON-file implementation used in production.
//! [`PersistQueue`] batches record changes so bursts of merge activity
//! collapse into one write per device.

mod file_store;
mod queue;

pub use file_store::FileDeviceStorage;
pub use queue::PersistQueue;

use mwarden_core::{DeviceRecord, Result};

/// Durable storage contract for device records.
///
/// Writes operate on one record at a time so a single failure never takes the
/// rest of a batch down with it.
#[trait_variant::make(DeviceStorage: Send)]
pub trait LocalDeviceStorage {
    /// Load every saved record. Missing backing data is an empty list, not an
    /// error.
    async fn load_devices(&self) -> Result<Vec<DeviceRecord>>;

    /// Insert or update one record, keyed by [`DeviceRecord::id`].
    async fn save_device(&self, record: &DeviceRecord) -> Result<()>;

    /// Remove one record. Deleting an absent id succeeds.
    async fn delete_device(&self, device_id: &str) -> Result<()>;
}
