//! Debounced write-back queue for device records
//!
//! Record changes are coalesced by device id; each enqueue bumps a generation
//! counter that invalidates previously armed debounce timers. When the timer
//! belonging to the current generation fires, the queue drains into a batch
//! and marks itself flushing; changes arriving mid-flush accumulate for the
//! next cycle rather than joining the in-flight batch.
//!
//! The queue holds no timers itself. The handler arms them through an action
//! and feeds expiry back in as a message, so this stays synchronously
//! testable.

use std::collections::HashMap;

use mwarden_core::DeviceRecord;

#[derive(Debug, Default)]
pub struct PersistQueue {
    pending: HashMap<String, DeviceRecord>,
    generation: u64,
    flushing: bool,
}

impl PersistQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a record for writing, replacing any pending change for the same
    /// id. Returns the new generation to arm a debounce timer with.
    pub fn enqueue(&mut self, record: DeviceRecord) -> u64 {
        self.pending.insert(record.id.clone(), record);
        self.generation += 1;
        self.generation
    }

    /// Drop a pending change, e.g. when its device is being removed.
    pub fn remove_pending(&mut self, device_id: &str) -> bool {
        self.pending.remove(device_id).is_some()
    }

    /// Whether a timer armed with `generation` is still the latest one.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drain the pending set into a batch and mark the queue flushing.
    ///
    /// Batches are ordered by id so logs and tests see stable output.
    pub fn begin_flush(&mut self) -> Vec<DeviceRecord> {
        self.flushing = true;
        let mut batch: Vec<DeviceRecord> = self.pending.drain().map(|(_, record)| record).collect();
        batch.sort_by(|a, b| a.id.cmp(&b.id));
        batch
    }

    /// Mark the in-flight flush finished. Returns `true` if changes arrived
    /// during the flush and a new timer should be armed.
    pub fn finish_flush(&mut self) -> bool {
        self.flushing = false;
        !self.pending.is_empty()
    }

    /// Take everything pending regardless of flush state. Used at teardown,
    /// when no further cycles will run.
    pub fn drain_pending(&mut self) -> Vec<DeviceRecord> {
        self.flushing = false;
        let mut batch: Vec<DeviceRecord> = self.pending.drain().map(|(_, record)| record).collect();
        batch.sort_by(|a, b| a.id.cmp(&b.id));
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str) -> DeviceRecord {
        DeviceRecord::usb(id, name)
    }

    #[test]
    fn test_enqueue_coalesces_by_id() {
        let mut queue = PersistQueue::new();
        let gen1 = queue.enqueue(record("a", "First"));
        let gen2 = queue.enqueue(record("a", "Second"));
        let gen3 = queue.enqueue(record("b", "Other"));

        assert!(gen1 < gen2 && gen2 < gen3);
        assert_eq!(queue.pending_len(), 2);

        let batch = queue.begin_flush();
        assert_eq!(batch.len(), 2);
        // Latest value wins for the coalesced id.
        assert_eq!(batch[0].id, "a");
        assert_eq!(batch[0].name, "Second");
    }

    #[test]
    fn test_generation_invalidates_older_timers() {
        let mut queue = PersistQueue::new();
        let old = queue.enqueue(record("a", "First"));
        let latest = queue.enqueue(record("a", "Second"));

        assert!(!queue.is_current(old));
        assert!(queue.is_current(latest));
    }

    #[test]
    fn test_enqueue_during_flush_lands_in_next_cycle() {
        let mut queue = PersistQueue::new();
        queue.enqueue(record("a", "First"));

        let batch = queue.begin_flush();
        assert_eq!(batch.len(), 1);
        assert!(queue.is_flushing());

        queue.enqueue(record("b", "Late"));
        assert!(queue.finish_flush());
        assert!(!queue.is_flushing());
        assert_eq!(queue.pending_len(), 1);

        let next = queue.begin_flush();
        assert_eq!(next[0].id, "b");
        assert!(!queue.finish_flush());
    }

    #[test]
    fn test_remove_pending_drops_queued_change() {
        let mut queue = PersistQueue::new();
        queue.enqueue(record("a", "One"));
        assert!(queue.remove_pending("a"));
        assert!(!queue.remove_pending("a"));
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_drain_pending_ignores_flush_state() {
        let mut queue = PersistQueue::new();
        queue.enqueue(record("a", "One"));
        let _ = queue.begin_flush();
        queue.enqueue(record("b", "Two"));

        let drained = queue.drain_pending();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].id, "b");
        assert!(!queue.is_flushing());
        assert!(!queue.has_pending());
    }
}
