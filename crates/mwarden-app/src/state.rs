//! Engine state: everything the update handlers read and write
//!
//! Owned exclusively by the engine task. Handlers mutate it synchronously;
//! anything slow or fallible goes through an action instead.

use std::collections::HashSet;

use crate::config::Settings;
use crate::events::EngineEvent;
use crate::monitor::SessionMonitor;
use crate::persist::PersistQueue;
use crate::store::DeviceStore;
use mwarden_core::{DeviceRecord, MirrorSession};

pub struct PanelState {
    /// Canonical device list.
    pub store: DeviceStore,
    /// Tracked mirroring sessions.
    pub monitor: SessionMonitor,
    /// Debounced write-back queue.
    pub queue: PersistQueue,
    /// Active configuration.
    pub settings: Settings,
    /// Set while a reconciliation pass is in flight; ticks arriving meanwhile
    /// are skipped rather than stacked.
    pub reconcile_inflight: bool,
    /// Devices with a start command dispatched but not yet confirmed.
    pub starting: HashSet<String>,
    /// Removed ids whose storage deletion has not yet been observed in a
    /// saved snapshot. Keeps a reconciliation from resurrecting them.
    pub removed_pending: HashSet<String>,

    pending_events: Vec<EngineEvent>,
    should_quit: bool,
}

impl PanelState {
    pub fn new(settings: Settings) -> Self {
        Self {
            store: DeviceStore::new(),
            monitor: SessionMonitor::new(),
            queue: PersistQueue::new(),
            settings,
            reconcile_inflight: false,
            starting: HashSet::new(),
            removed_pending: HashSet::new(),
            pending_events: Vec::new(),
            should_quit: false,
        }
    }

    /// Queue an event for emission once the current message drains.
    pub fn push_event(&mut self, event: EngineEvent) {
        self.pending_events.push(event);
    }

    /// Take accumulated events, oldest first.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.pending_events)
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.store.snapshot()
    }

    pub fn sessions(&self) -> Vec<MirrorSession> {
        self.monitor.snapshot()
    }
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_events_drains_in_order() {
        let mut state = PanelState::default();
        state.push_event(EngineEvent::Shutdown);
        state.push_event(EngineEvent::DevicesChanged { devices: vec![] });

        let events = state.take_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "shutdown");
        assert_eq!(events[1].event_type(), "devices_changed");
        assert!(state.take_events().is_empty());
    }

    #[test]
    fn test_quit_flag() {
        let mut state = PanelState::default();
        assert!(!state.should_quit());
        state.request_quit();
        assert!(state.should_quit());
    }
}
