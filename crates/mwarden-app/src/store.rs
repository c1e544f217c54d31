//! Canonical in-memory device list
//!
//! The [`DeviceStore`] is the single source of truth the panel surface reads
//! from. Records keep insertion order so saved devices stay ahead of ones
//! discovered later in the run; lookups go by [`DeviceRecord::id`].

use mwarden_core::DeviceRecord;

/// Ordered, id-keyed collection of device records.
#[derive(Debug, Default)]
pub struct DeviceStore {
    records: Vec<DeviceRecord>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.records.iter().any(|record| record.id == device_id)
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceRecord> {
        self.records.iter().find(|record| record.id == device_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.iter()
    }

    /// Current records as a slice, for cheap change comparisons.
    pub fn records(&self) -> &[DeviceRecord] {
        &self.records
    }

    /// Cloned copy of the full list, in order.
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.records.clone()
    }

    /// Insert a record, or replace the existing one with the same id in place.
    pub fn upsert(&mut self, record: DeviceRecord) {
        match self.records.iter_mut().find(|slot| slot.id == record.id) {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
    }

    /// Swap in a freshly reconciled list.
    pub fn replace_all(&mut self, records: Vec<DeviceRecord>) {
        self.records = records;
    }

    /// Rename a device. Returns a clone of the updated record, or `None` if
    /// the id is unknown.
    pub fn rename(&mut self, device_id: &str, new_name: &str) -> Option<DeviceRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == device_id)?;
        record.name = new_name.to_string();
        Some(record.clone())
    }

    /// Remove a device, returning the record if it was present.
    pub fn remove(&mut self, device_id: &str) -> Option<DeviceRecord> {
        let index = self
            .records
            .iter()
            .position(|record| record.id == device_id)?;
        Some(self.records.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mwarden_core::DeviceStatus;

    fn record(id: &str, name: &str) -> DeviceRecord {
        DeviceRecord::usb(id, name)
    }

    #[test]
    fn test_upsert_inserts_then_replaces_in_place() {
        let mut store = DeviceStore::new();
        store.upsert(record("a", "One"));
        store.upsert(record("b", "Two"));
        store.upsert(record("a", "One Renamed").with_status(DeviceStatus::Offline));

        assert_eq!(store.len(), 2);
        // Replacement keeps the original position.
        assert_eq!(store.records()[0].id, "a");
        assert_eq!(store.records()[0].name, "One Renamed");
        assert_eq!(store.records()[0].status, DeviceStatus::Offline);
        assert_eq!(store.records()[1].id, "b");
    }

    #[test]
    fn test_rename_known_and_unknown() {
        let mut store = DeviceStore::new();
        store.upsert(record("a", "One"));

        let updated = store.rename("a", "Desk Phone").unwrap();
        assert_eq!(updated.name, "Desk Phone");
        assert_eq!(store.get("a").unwrap().name, "Desk Phone");

        assert!(store.rename("missing", "Nope").is_none());
    }

    #[test]
    fn test_remove_returns_record_once() {
        let mut store = DeviceStore::new();
        store.upsert(record("a", "One"));

        let removed = store.remove("a").unwrap();
        assert_eq!(removed.id, "a");
        assert!(store.is_empty());
        assert!(store.remove("a").is_none());
    }

    #[test]
    fn test_replace_all_swaps_contents() {
        let mut store = DeviceStore::new();
        store.upsert(record("a", "One"));
        store.replace_all(vec![record("b", "Two"), record("c", "Three")]);

        assert!(!store.contains("a"));
        assert_eq!(store.snapshot().len(), 2);
    }
}
