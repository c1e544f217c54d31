//! JSON-file device storage
//!
//! Records live in a single `devices.json` under the app data directory.
//! Writes go through a sibling temp file renamed over the target, with an
//! `fs2` exclusive lock on a dedicated lock file serializing the
//! read-modify-write against other panel instances.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use mwarden_core::{DeviceRecord, Error, Result};

use super::DeviceStorage;

const DEVICES_FILENAME: &str = "devices.json";
const LOCK_FILENAME: &str = ".devices.json.lock";

/// Device storage backed by one JSON file.
#[derive(Debug, Clone)]
pub struct FileDeviceStorage {
    path: PathBuf,
}

impl FileDeviceStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Standard location: `<data_local_dir>/mirror-warden/devices.json`.
    pub fn default_path() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join("mirror-warden").join(DEVICES_FILENAME))
            .ok_or_else(|| Error::storage("could not determine the local data directory"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the cross-process write lock. Held until the returned handle
    /// drops.
    fn acquire_lock(&self) -> Result<File> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::storage(format!("no parent directory for {:?}", self.path)))?;
        fs::create_dir_all(parent)
            .map_err(|e| Error::storage(format!("failed to create {parent:?}: {e}")))?;

        let lock_path = parent.join(LOCK_FILENAME);
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| Error::storage(format!("failed to open lock file {lock_path:?}: {e}")))?;
        lock.lock_exclusive()
            .map_err(|e| Error::storage(format!("failed to lock {lock_path:?}: {e}")))?;
        Ok(lock)
    }

    fn read_records(&self) -> Result<Vec<DeviceRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| Error::storage(format!("failed to read {:?}: {e}", self.path)))?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| Error::storage(format!("failed to parse {:?}: {e}", self.path)))
    }

    /// Write the full list atomically: temp file in the same directory, then
    /// rename over the target.
    fn write_records(&self, records: &[DeviceRecord]) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::storage(format!("no parent directory for {:?}", self.path)))?;
        let temp_path = parent.join(format!(".{DEVICES_FILENAME}.tmp"));

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| Error::storage(format!("failed to serialize device records: {e}")))?;
        fs::write(&temp_path, json)
            .map_err(|e| Error::storage(format!("failed to write {temp_path:?}: {e}")))?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            Error::storage(format!("failed to replace {:?}: {e}", self.path))
        })?;

        debug!("Wrote {} device record(s) to {:?}", records.len(), self.path);
        Ok(())
    }
}

impl DeviceStorage for FileDeviceStorage {
    async fn load_devices(&self) -> Result<Vec<DeviceRecord>> {
        self.read_records()
    }

    async fn save_device(&self, record: &DeviceRecord) -> Result<()> {
        let _lock = self.acquire_lock()?;
        let mut records = self.read_records()?;
        match records.iter_mut().find(|slot| slot.id == record.id) {
            Some(slot) => *slot = record.clone(),
            None => records.push(record.clone()),
        }
        self.write_records(&records)
    }

    async fn delete_device(&self, device_id: &str) -> Result<()> {
        let _lock = self.acquire_lock()?;
        let mut records = self.read_records()?;
        let before = records.len();
        records.retain(|record| record.id != device_id);
        if records.len() == before {
            debug!("Delete for {device_id} found nothing to remove");
            return Ok(());
        }
        self.write_records(&records)
    }
}
