//! Merge live bridge scans with saved device records
//!
//! One reconciliation pass takes the two snapshots and produces the next
//! canonical list plus the records that need a durable write. The merge is a
//! pure function: fetching the snapshots and writing the results stay in the
//! action layer.
//!
//! Rules, per field:
//! - identity: records pair up by id; saved order comes first, never-seen live
//!   devices append in scan order.
//! - `name` always comes from the saved side. User renames survive whatever
//!   the bridge reports.
//! - every other field (`model`, `status`, `connection_kind`, `address`) comes
//!   from the live side when the device is present.
//! - saved devices absent from the scan demote to `Offline` but are kept.
//!
//! Writes are needed for devices seen for the first time and for merges where
//! the live model differs from the saved one.

use std::collections::HashMap;

use mwarden_core::DeviceRecord;

/// The outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// Next canonical device list, in stable order.
    pub records: Vec<DeviceRecord>,
    /// Records that changed durably and belong in the persistence queue.
    pub to_persist: Vec<DeviceRecord>,
}

/// Merge a live scan into the saved device list.
pub fn reconcile(live: &[DeviceRecord], saved: &[DeviceRecord]) -> ReconcileOutcome {
    // Saved devices are presumed absent until the scan proves otherwise.
    let mut records: Vec<DeviceRecord> = saved.iter().map(DeviceRecord::as_offline).collect();
    let mut index: HashMap<&str, usize> = saved
        .iter()
        .enumerate()
        .map(|(position, record)| (record.id.as_str(), position))
        .collect();
    let mut to_persist = Vec::new();

    for seen in live {
        match index.get(seen.id.as_str()) {
            Some(&position) => {
                let slot = &mut records[position];
                let model_changed = slot.model != seen.model;
                let mut merged = seen.clone();
                merged.name = slot.name.clone();
                *slot = merged;
                if model_changed {
                    to_persist.push(records[position].clone());
                }
            }
            None => {
                index.insert(seen.id.as_str(), records.len());
                records.push(seen.clone());
                to_persist.push(seen.clone());
            }
        }
    }

    ReconcileOutcome { records, to_persist }
}
